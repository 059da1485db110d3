/// Errors returned by fallible [`HashMap`](crate::HashMap) lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The requested key is not present in the map.
    #[error("key not found")]
    NotFound,
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn displays_reason() {
        assert_eq!(Error::NotFound.to_string(), "key not found");
    }
}
