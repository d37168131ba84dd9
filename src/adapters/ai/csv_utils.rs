//! CSV export of the chat transcript. Uses the `csv` crate for safe serialization.

use crate::domain::ChatTurn;

/// Convert chat turns to a CSV string.
///
/// Format: `Role;Date;Message` (semicolon-delimited, header row included).
/// Newlines inside messages are flattened to spaces so each turn is one row.
pub fn turns_to_csv(turns: &[ChatTurn]) -> Result<String, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_writer(Vec::new());

    wtr.write_record(["Role", "Date", "Message"])?;

    for turn in turns {
        let date_str = turn.created_at.format("%Y-%m-%d %H:%M").to_string();
        let clean_text = turn.text.replace('\n', " ").replace('\r', "");
        wtr.write_record([turn.role.to_string().as_str(), &date_str, &clean_text])?;
    }

    wtr.flush()?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))?;

    String::from_utf8(bytes).map_err(|e| {
        csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })
}
