use garde::Validate;
use serde::{Deserialize, Deserializer, Serialize};

pub const MAX_PAGE_SIZE: i64 = 100;

/// Listing query, `page` below 1 or missing means first page.
#[derive(Debug, Clone, Validate, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct Paging {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[garde(skip)]
    page: Option<i64>,
    #[garde(range(min = 1, max = MAX_PAGE_SIZE))]
    page_size: i64,
}

/// Empty `page=` counts as missing.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(page) => page.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl Paging {
    pub fn new(page: Option<i64>, page_size: i64) -> Self {
        Self { page, page_size }
    }

    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }
}

/// Row offset of a page, pages are numbered from 1.
pub fn page_offset(page: i64, page_size: i64) -> i64 {
    if page > 0 {
        (page - 1).saturating_mul(page_size)
    } else {
        0
    }
}

/// Number of pages needed for `total_data` rows, never less than 1.
pub fn page_count(page_size: i64, total_data: i64) -> i64 {
    if page_size <= 0 || page_size >= total_data {
        return 1;
    }
    if total_data % page_size == 0 {
        total_data / page_size
    } else {
        total_data / page_size + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PageMeta {
    pub page_count: i64,
    pub total_data: i64,
}

impl PageMeta {
    pub fn new(page_size: i64, total_data: i64) -> Self {
        Self {
            page_count: page_count(page_size, total_data),
            total_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::Query;

    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(1, 1), 1);
        assert_eq!(page_count(5, 10), 2);
        assert_eq!(page_count(6, 5), 1);
        assert_eq!(page_count(3, 10), 4);
        assert_eq!(page_count(10, 0), 1);
        assert_eq!(page_count(0, 10), 1);
        assert_eq!(page_count(-5, 10), 1);
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(page_offset(0, 20), 0);
        assert_eq!(page_offset(-2, 20), 0);
    }

    #[test]
    fn test_paging_query() {
        let paging: Paging = serde_json::from_str(r#"{"page_size": 10}"#).unwrap();
        assert_eq!(paging.page(), 1);
        assert!(paging.validate().is_ok());

        assert_eq!(Paging::new(Some(-1), 10).page(), 1);
        assert_eq!(Paging::new(Some(4), 10).page(), 4);

        assert!(Paging::new(None, 100).validate().is_ok());
        assert!(Paging::new(None, 101).validate().is_err());
        assert!(Paging::new(None, 0).validate().is_err());

        let missing = serde_json::from_str::<Paging>(r#"{"page": "2"}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn test_paging_query_string() {
        let parse = |query: &str| {
            let uri: http::Uri = format!("/cakes?{query}").parse().unwrap();
            Query::<Paging>::try_from_uri(&uri).map(|Query(paging)| paging)
        };

        assert_eq!(parse("page=&page_size=10").unwrap().page(), 1);
        assert_eq!(parse("page_size=10").unwrap().page(), 1);
        assert_eq!(parse("page=3&page_size=10").unwrap().page(), 3);
        assert_eq!(parse("page=-3&page_size=10").unwrap().page(), 1);
        assert!(parse("page=x&page_size=10").is_err());
        assert!(parse("page=2").is_err());
    }
}
