//! Product tag updates and catalog search against a running storefront.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;

use reqwest::StatusCode;
use shopkeep_core::{CategoryId, Cost, TagId};
use shopkeep_integration_tests::{
    TestClient, category_of, create_product, create_tag, location, pool, product_tags,
    tag_product,
};
use shopkeep_storefront::db::{ProductFilter, ProductRepository};
use sqlx::PgPool;
use uuid::Uuid;

fn marker() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Three products sharing a name marker: `alpha` (500, tags a and b),
/// `beta` (1500, tag a) and `gamma` (2500, untagged).
struct Catalog {
    marker: String,
    tag_a: i32,
    tag_b: i32,
    alpha: i32,
    beta: i32,
    gamma: i32,
}

impl Catalog {
    async fn seed(pool: &PgPool) -> Self {
        let marker = marker();
        let tag_a = create_tag(pool, &format!("a-{marker}")).await;
        let tag_b = create_tag(pool, &format!("b-{marker}")).await;

        let alpha = create_product(pool, &format!("{marker} alpha"), 500).await;
        let beta = create_product(pool, &format!("{marker} beta"), 1500).await;
        let gamma = create_product(pool, &format!("{marker} gamma"), 2500).await;
        tag_product(pool, alpha, &[tag_a, tag_b]).await;
        tag_product(pool, beta, &[tag_a]).await;

        Self { marker, tag_a, tag_b, alpha, beta, gamma }
    }

    fn by_name(&self) -> ProductFilter {
        ProductFilter {
            name: Some(self.marker.clone()),
            ..ProductFilter::default()
        }
    }
}

async fn search(pool: &PgPool, filter: &ProductFilter) -> Vec<i32> {
    ProductRepository::new(pool)
        .list(filter)
        .await
        .unwrap()
        .iter()
        .map(|p| p.product.id.as_i32())
        .collect()
}

fn tag_set(ids: &[i32]) -> BTreeSet<TagId> {
    ids.iter().copied().map(TagId::new).collect()
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_update_replaces_tag_set() {
    let pool = pool().await;
    let client = TestClient::new();
    let marker = marker();
    let product = create_product(&pool, &format!("Retagged {marker}"), 1200).await;
    let category = category_of(&pool, product).await.to_string();

    let mut tags = Vec::new();
    for n in 1..=4 {
        tags.push(create_tag(&pool, &format!("t{n}-{marker}")).await);
    }
    let [t1, t2, t3, t4]: [i32; 4] = tags.try_into().unwrap();
    tag_product(&pool, product, &[t1, t2, t3]).await;

    let action = format!("/products/{product}/update");
    let name = format!("Retagged {marker}");
    let (t2s, t4s) = (t2.to_string(), t4.to_string());
    let mut fields = vec![
        ("name", name.as_str()),
        ("cost", "1300"),
        ("description", "Now tagged differently"),
        ("category_id", category.as_str()),
        ("brand_id", ""),
        ("image_url", ""),
    ];
    fields.extend([("tags", t2s.as_str()), ("tags", t4s.as_str())]);

    let resp = client.submit("/categories", &action, &fields).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp).as_deref(), Some("/products"));
    assert_eq!(product_tags(&pool, product).await, vec![t2, t4]);

    // Submitting no tags detaches every one.
    fields.truncate(6);
    let resp = client.submit("/categories", &action, &fields).await;
    assert_eq!(location(&resp).as_deref(), Some("/products"));
    assert!(product_tags(&pool, product).await.is_empty());

    let t3_links: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM products_tags WHERE tag_id = $1")
            .bind(t3)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(t3_links, 0);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_empty_filter_lists_every_product_once() {
    let pool = pool().await;
    let catalog = Catalog::seed(&pool).await;

    let ids = search(&pool, &ProductFilter::default()).await;
    let unique: BTreeSet<i32> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
    for id in [catalog.alpha, catalog.beta, catalog.gamma] {
        assert!(unique.contains(&id), "product {id} missing from unfiltered list");
    }

    assert_eq!(
        search(&pool, &catalog.by_name()).await,
        vec![catalog.alpha, catalog.beta, catalog.gamma]
    );
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_tag_filter_matches_any_tag_without_duplicates() {
    let pool = pool().await;
    let catalog = Catalog::seed(&pool).await;

    let filter = ProductFilter {
        tag_ids: tag_set(&[catalog.tag_a, catalog.tag_b]),
        ..catalog.by_name()
    };
    assert_eq!(search(&pool, &filter).await, vec![catalog.alpha, catalog.beta]);

    let filter = ProductFilter {
        tag_ids: tag_set(&[catalog.tag_b]),
        ..catalog.by_name()
    };
    assert_eq!(search(&pool, &filter).await, vec![catalog.alpha]);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_filters_combine_as_conjunction() {
    let pool = pool().await;
    let catalog = Catalog::seed(&pool).await;
    let category = CategoryId::new(category_of(&pool, catalog.alpha).await);

    let filter = ProductFilter {
        min_cost: Some(Cost::new(1000).unwrap()),
        max_cost: Some(Cost::new(2500).unwrap()),
        ..catalog.by_name()
    };
    assert_eq!(search(&pool, &filter).await, vec![catalog.beta, catalog.gamma]);

    let filter = ProductFilter {
        min_cost: Some(Cost::new(1000).unwrap()),
        category_id: Some(category),
        tag_ids: tag_set(&[catalog.tag_a]),
        ..catalog.by_name()
    };
    assert_eq!(search(&pool, &filter).await, vec![catalog.beta]);

    let filter = ProductFilter {
        max_cost: Some(Cost::new(499).unwrap()),
        ..catalog.by_name()
    };
    assert!(search(&pool, &filter).await.is_empty());
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_search_page_applies_query() {
    let pool = pool().await;
    let catalog = Catalog::seed(&pool).await;
    let client = TestClient::new();

    let page = client
        .page(&format!(
            "/products?name={}&min_cost=&max_cost=&category_id=&tags={}",
            catalog.marker, catalog.tag_a
        ))
        .await;

    assert!(page.contains(&format!("{} alpha", catalog.marker)));
    assert!(page.contains(&format!("{} beta", catalog.marker)));
    assert!(!page.contains(&format!("{} gamma", catalog.marker)));
}
