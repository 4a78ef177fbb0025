//! Prescriber entity.

/// A clinician who issued one or more prescriptions.
///
/// The natural `prescriber_id` is unique: re-ingesting a contract that
/// references a known prescriber updates this row in place rather than
/// duplicating it. Many prescriptions may reference one prescriber, and
/// deleting a patient never deletes the prescriber.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prescriber {
    /// Row identifier.
    pub id: i64,
    pub fname: String,
    pub lname: String,
    /// Qualification string, e.g. `"( MBBS; FRACGP )"`.
    pub title: Option<String>,
    pub address_1: String,
    pub address_2: String,
    /// Natural prescriber identifier from the contract.
    pub prescriber_id: i64,
    /// 16-digit healthcare provider identifier (individual).
    pub hpii: i64,
    /// 16-digit healthcare provider identifier (organisation).
    pub hpio: i64,
    pub phone: String,
    pub fax: Option<String>,
}

impl Prescriber {
    /// Display name in `"Family, Given"` order, as used by search results.
    pub fn listing_name(&self) -> String {
        format!("{}, {}", self.lname, self.fname)
    }
}
