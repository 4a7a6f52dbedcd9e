//! Instance identity.

/// Generate an instance id of the form `{service_name}-{n}`.
///
/// `n` is a random non-negative integer. Ids only need to be distinct
/// across instances of the same service starting at the same time, so a
/// non-cryptographic source is enough.
pub fn generate_instance_id(service_name: &str) -> String {
    let n: u64 = rand::random();
    format!("{service_name}-{n}")
}
