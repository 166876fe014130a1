//! Shared test utilities for sift-db unit tests.

#[cfg(test)]
pub(crate) mod helpers {
    use crate::SiftDb;
    use crate::service::SiftService;
    use crate::trail::writer::TrailWriter;

    /// Create an in-memory `SiftService` with the trail disabled.
    pub async fn test_service() -> SiftService {
        let db = SiftDb::open_local(":memory:").await.unwrap();
        SiftService::from_db(db, TrailWriter::disabled())
    }
}
