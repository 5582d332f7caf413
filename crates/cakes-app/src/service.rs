use std::sync::Arc;

use cakes_dal::{
    cake::{Cake, CakeFields, CakeRepository, CakeStore},
    ListingParams,
};
use serde::{Deserialize, Serialize};
use time::{macros::format_description, OffsetDateTime, UtcOffset};
use tracing::{debug, warn};

use crate::{
    error::{Result, ServiceError},
    paging::{page_offset, PageMeta},
};

pub type CakeService = CakeServiceImpl<CakeRepository>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CakeView {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub rating: f32,
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Echo of fields written by create or update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CakeMutation {
    pub title: String,
    pub description: Option<String>,
    pub rating: f32,
    pub image: Option<String>,
}

impl From<CakeFields> for CakeMutation {
    fn from(fields: CakeFields) -> Self {
        Self {
            title: fields.title,
            description: fields.description,
            rating: fields.rating,
            image: fields.image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CakeDeleted {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CakePage {
    pub meta: PageMeta,
    pub cakes: Vec<CakeView>,
}

fn format_timestamp(ts: OffsetDateTime, offset: UtcOffset) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    ts.to_offset(offset).format(format).unwrap_or_else(|e| {
        warn!("Cannot format timestamp {ts}: {e}");
        ts.to_string()
    })
}

/// Cake use cases on top of a [`CakeStore`].
///
/// Timestamps in views are shown in `local_offset`, which should be determined
/// once at startup, because the local offset cannot be reliably queried
/// from a multi-threaded process.
pub struct CakeServiceImpl<S> {
    store: Arc<S>,
    local_offset: UtcOffset,
}

impl<S> Clone for CakeServiceImpl<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            local_offset: self.local_offset,
        }
    }
}

impl<S: CakeStore> CakeServiceImpl<S> {
    pub fn new(store: S, local_offset: UtcOffset) -> Self {
        Self {
            store: Arc::new(store),
            local_offset,
        }
    }

    fn view(&self, cake: Cake) -> CakeView {
        CakeView {
            id: cake.id,
            title: cake.title,
            description: cake.description,
            rating: cake.rating,
            image: cake.image,
            created_at: format_timestamp(cake.created_at, self.local_offset),
            updated_at: format_timestamp(cake.updated_at, self.local_offset),
        }
    }

    pub async fn get_detail(&self, id: i64) -> Result<CakeView> {
        let cake = self
            .store
            .get(id)
            .await
            .map_err(|e| ServiceError::internal("error get cake data", e))?
            .ok_or(ServiceError::NotFound(id))?;
        Ok(self.view(cake))
    }

    /// Count and page are fetched concurrently, failure of either fails whole listing.
    pub async fn list(&self, page: i64, page_size: i64) -> Result<CakePage> {
        let params = ListingParams::new(page_offset(page, page_size), page_size);
        let (total, cakes) = tokio::join!(self.store.count(), self.store.list(params));

        let cakes = cakes.map_err(|e| ServiceError::internal("error on get data cakes", e))?;
        let total_data =
            total.map_err(|e| ServiceError::internal("error on count total cakes", e))?;
        debug!(
            "Listed {} cakes of {total_data} (page {page}, size {page_size})",
            cakes.len()
        );

        Ok(CakePage {
            meta: PageMeta::new(page_size, total_data),
            cakes: cakes.into_iter().map(|c| self.view(c)).collect(),
        })
    }

    /// Returns id of the new cake together with the echo.
    pub async fn create(&self, fields: CakeFields) -> Result<(i64, CakeMutation)> {
        let id = self
            .store
            .insert(fields.clone())
            .await
            .map_err(|e| ServiceError::internal("error add cake data", e))?;
        debug!("Created cake {id}");
        Ok((id, fields.into()))
    }

    pub async fn update(&self, id: i64, fields: CakeFields) -> Result<CakeMutation> {
        self.get_detail(id).await?;
        self.store
            .update(id, fields.clone())
            .await
            .map_err(|e| ServiceError::internal("error update cake data", e))?;
        Ok(fields.into())
    }

    pub async fn delete(&self, id: i64) -> Result<CakeDeleted> {
        self.get_detail(id).await?;
        self.store
            .soft_delete(id)
            .await
            .map_err(|e| ServiceError::internal("error delete cake data", e))?;
        debug!("Soft deleted cake {id}");
        Ok(CakeDeleted { id })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use time::macros::{datetime, offset};
    use tracing_test::traced_test;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Fault {
        None,
        Count,
        List,
        Both,
        Mutation,
    }

    struct FakeStore {
        cakes: Mutex<Vec<Cake>>,
        fault: Fault,
    }

    fn store_error() -> cakes_dal::Error {
        cakes_dal::Error::DatabaseError(cakes_dal::SqlxError::PoolTimedOut)
    }

    const CREATED: OffsetDateTime = datetime!(2024-01-02 03:04:05 UTC);

    impl FakeStore {
        fn new(fault: Fault) -> Self {
            FakeStore {
                cakes: Mutex::new(Vec::new()),
                fault,
            }
        }

        fn with_cakes(fault: Fault, cakes: &[(&str, f32)]) -> Self {
            let store = FakeStore::new(fault);
            {
                let mut rows = store.cakes.lock().unwrap();
                for (i, (title, rating)) in cakes.iter().enumerate() {
                    rows.push(Cake {
                        id: i as i64 + 1,
                        title: title.to_string(),
                        description: None,
                        rating: *rating,
                        image: None,
                        created_at: CREATED,
                        updated_at: CREATED,
                        deleted_at: None,
                    });
                }
            }
            store
        }

        fn visible(&self) -> Vec<Cake> {
            self.cakes
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.deleted_at.is_none())
                .cloned()
                .collect()
        }
    }

    impl CakeStore for FakeStore {
        async fn list(&self, params: ListingParams) -> cakes_dal::error::Result<Vec<Cake>> {
            if matches!(self.fault, Fault::List | Fault::Both) {
                return Err(store_error());
            }
            let mut cakes = self.visible();
            cakes.sort_by(|a, b| {
                b.rating
                    .total_cmp(&a.rating)
                    .then_with(|| a.title.cmp(&b.title))
            });
            Ok(cakes
                .into_iter()
                .skip(params.offset as usize)
                .take(params.limit as usize)
                .collect())
        }

        async fn count(&self) -> cakes_dal::error::Result<i64> {
            if matches!(self.fault, Fault::Count | Fault::Both) {
                return Err(store_error());
            }
            Ok(self.visible().len() as i64)
        }

        async fn get(&self, id: i64) -> cakes_dal::error::Result<Option<Cake>> {
            Ok(self.visible().into_iter().find(|c| c.id == id))
        }

        async fn insert(&self, fields: CakeFields) -> cakes_dal::error::Result<i64> {
            if self.fault == Fault::Mutation {
                return Err(store_error());
            }
            let mut cakes = self.cakes.lock().unwrap();
            let id = cakes.len() as i64 + 1;
            cakes.push(Cake {
                id,
                title: fields.title,
                description: fields.description,
                rating: fields.rating,
                image: fields.image,
                created_at: CREATED,
                updated_at: CREATED,
                deleted_at: None,
            });
            Ok(id)
        }

        async fn update(&self, id: i64, fields: CakeFields) -> cakes_dal::error::Result<()> {
            if self.fault == Fault::Mutation {
                return Err(store_error());
            }
            let mut cakes = self.cakes.lock().unwrap();
            if let Some(cake) = cakes.iter_mut().find(|c| c.id == id) {
                cake.title = fields.title;
                cake.description = fields.description;
                cake.rating = fields.rating;
                cake.image = fields.image;
            }
            Ok(())
        }

        async fn soft_delete(&self, id: i64) -> cakes_dal::error::Result<()> {
            if self.fault == Fault::Mutation {
                return Err(store_error());
            }
            let mut cakes = self.cakes.lock().unwrap();
            if let Some(cake) = cakes.iter_mut().find(|c| c.id == id) {
                cake.deleted_at = Some(OffsetDateTime::now_utc());
            }
            Ok(())
        }
    }

    fn service(store: FakeStore) -> CakeServiceImpl<FakeStore> {
        CakeServiceImpl::new(store, UtcOffset::UTC)
    }

    fn fields(title: &str, rating: f32) -> CakeFields {
        CakeFields {
            title: title.to_string(),
            description: None,
            rating,
            image: None,
        }
    }

    const CAKES: &[(&str, f32)] = &[
        ("Lemon cheesecake", 4.0),
        ("Brownie", 5.0),
        ("Apple pie", 4.0),
        ("Fruit cake", 2.5),
        ("Carrot cake", 3.0),
    ];

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(CREATED, UtcOffset::UTC), "2024-01-02 03:04:05");
        assert_eq!(format_timestamp(CREATED, offset!(+2)), "2024-01-02 05:04:05");
    }

    #[tokio::test]
    async fn test_get_detail() {
        let svc = service(FakeStore::with_cakes(Fault::None, CAKES));
        let cake = svc.get_detail(2).await.unwrap();
        assert_eq!(cake.title, "Brownie");
        assert_eq!(cake.created_at, "2024-01-02 03:04:05");
        assert_eq!(cake.created_at, cake.updated_at);

        let res = svc.get_detail(100).await;
        assert!(matches!(res, Err(ServiceError::NotFound(100))));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_list_pages() {
        let svc = service(FakeStore::with_cakes(Fault::None, CAKES));

        let page = svc.list(1, 2).await.unwrap();
        assert_eq!(
            page.meta,
            PageMeta {
                page_count: 3,
                total_data: 5
            }
        );
        let titles = page.cakes.iter().map(|c| c.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, ["Brownie", "Apple pie"]);

        assert!(logs_contain("Listed 2 cakes of 5"));

        let page = svc.list(3, 2).await.unwrap();
        assert_eq!(page.cakes.len(), 1);
        assert_eq!(page.cakes[0].title, "Fruit cake");

        // page below 1 is the first page
        let page = svc.list(0, 2).await.unwrap();
        assert_eq!(page.cakes[0].title, "Brownie");

        let page = svc.list(1, 10).await.unwrap();
        assert_eq!(page.meta.page_count, 1);
        assert_eq!(page.cakes.len(), 5);
    }

    #[tokio::test]
    async fn test_list_failures() {
        let svc = service(FakeStore::with_cakes(Fault::Count, CAKES));
        match svc.list(1, 2).await {
            Err(ServiceError::Internal { message, .. }) => {
                assert_eq!(message, "error on count total cakes")
            }
            other => panic!("Unexpected result {other:?}"),
        }

        let svc = service(FakeStore::with_cakes(Fault::List, CAKES));
        match svc.list(1, 2).await {
            Err(ServiceError::Internal { message, detail }) => {
                assert_eq!(message, "error on get data cakes");
                assert!(!detail.is_empty());
            }
            other => panic!("Unexpected result {other:?}"),
        }

        let svc = service(FakeStore::with_cakes(Fault::Both, CAKES));
        match svc.list(1, 2).await {
            Err(ServiceError::Internal { message, .. }) => {
                assert_eq!(message, "error on get data cakes")
            }
            other => panic!("Unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_echoes_fields() {
        let svc = service(FakeStore::new(Fault::None));
        let new_cake = CakeFields {
            title: "Sacher".to_string(),
            description: Some("Viennese".to_string()),
            rating: 4.3,
            image: None,
        };
        let (id, echo) = svc.create(new_cake.clone()).await.unwrap();
        assert_eq!(echo, CakeMutation::from(new_cake));

        let stored = svc.get_detail(id).await.unwrap();
        assert_eq!(stored.title, "Sacher");
        assert_eq!(stored.description.as_deref(), Some("Viennese"));
        assert_eq!(stored.rating, 4.3);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let svc = service(FakeStore::with_cakes(Fault::None, CAKES));

        let res = svc.update(42, fields("Nothing", 1.0)).await;
        assert!(matches!(res, Err(ServiceError::NotFound(42))));
        let res = svc.delete(42).await;
        assert!(matches!(res, Err(ServiceError::NotFound(42))));

        let deleted = svc.delete(1).await.unwrap();
        assert_eq!(deleted, CakeDeleted { id: 1 });
        let res = svc.update(1, fields("Again", 1.0)).await;
        assert!(matches!(res, Err(ServiceError::NotFound(1))));
        let res = svc.delete(1).await;
        assert!(matches!(res, Err(ServiceError::NotFound(1))));

        let page = svc.list(1, 10).await.unwrap();
        assert_eq!(page.meta.total_data, 4);
        assert!(page.cakes.iter().all(|c| c.id != 1));
    }

    #[tokio::test]
    async fn test_update() {
        let svc = service(FakeStore::with_cakes(Fault::None, CAKES));
        let echo = svc.update(5, fields("Carrot muffin", 3.5)).await.unwrap();
        assert_eq!(echo.title, "Carrot muffin");
        let cake = svc.get_detail(5).await.unwrap();
        assert_eq!(cake.title, "Carrot muffin");
        assert_eq!(cake.rating, 3.5);
    }

    #[tokio::test]
    async fn test_mutation_failures() {
        let svc = service(FakeStore::with_cakes(Fault::Mutation, CAKES));

        let res = svc.create(fields("Broken", 1.0)).await;
        assert!(
            matches!(res, Err(ServiceError::Internal { message, .. }) if message == "error add cake data")
        );
        let res = svc.update(1, fields("Broken", 1.0)).await;
        assert!(
            matches!(res, Err(ServiceError::Internal { message, .. }) if message == "error update cake data")
        );
        let res = svc.delete(1).await;
        assert!(
            matches!(res, Err(ServiceError::Internal { message, .. }) if message == "error delete cake data")
        );
        // existence check comes first
        let res = svc.delete(99).await;
        assert!(matches!(res, Err(ServiceError::NotFound(99))));
    }
}
