//! ID generation utilities.

use ulid::Ulid;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs sort by creation time, which the ledger relies on for
    /// id-descending pagination of votes and reports.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_lowercase_ulids() {
        let id = IdGenerator::new().generate();

        assert_eq!(id.len(), 26);
        assert_eq!(id, id.to_lowercase());
        assert!(Ulid::from_string(&id).is_ok());
    }

    #[test]
    fn test_later_ids_sort_after_earlier_ones() {
        let id_gen = IdGenerator::new();
        let earlier = id_gen.generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let later = id_gen.generate();

        assert!(later > earlier);
    }
}
