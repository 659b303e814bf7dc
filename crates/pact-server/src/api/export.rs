//! CSV export of registrations for staff spreadsheets.

use registration_store::RegistrationRecord;

pub const EXPORT_FILENAME: &str = "registrations.csv";

const HEADER: &str =
    "registration_number,fullname,email,phone,organization,country,status,created_at\n";

/// One row per registration, in the order given.
pub fn registrations_csv(records: &[RegistrationRecord]) -> String {
    let mut csv = String::from(HEADER);
    for record in records {
        let details = &record.details;
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            quoted(&record.registration_number),
            quoted(&details.fullname),
            quoted(&details.email),
            quoted(&details.phone),
            quoted(&details.organization),
            quoted(&details.country),
            record.status,
            record.created_at.to_rfc3339(),
        ));
    }
    csv
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
