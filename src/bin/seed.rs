use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde_json::json;
use storefront_checkout::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::{Products, products},
    money::Money,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

struct DemoProduct {
    name: &'static str,
    description: &'static str,
    price: &'static str,
    stock: i32,
    image: &'static str,
}

const DEMO_PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        name: "Ceramic Pour-Over Set",
        description: "Hand-glazed dripper with a matching carafe.",
        price: "48.00",
        stock: 25,
        image: "https://picsum.photos/seed/pourover/800/800",
    },
    DemoProduct {
        name: "Linen Apron",
        description: "Washed linen with adjustable straps.",
        price: "32.50",
        stock: 40,
        image: "https://picsum.photos/seed/apron/800/800",
    },
    DemoProduct {
        name: "Cast Iron Skillet",
        description: "Pre-seasoned 26cm skillet.",
        price: "64.99",
        stock: 12,
        image: "https://picsum.photos/seed/skillet/800/800",
    },
    DemoProduct {
        name: "Beeswax Wraps",
        description: "Set of three reusable food wraps.",
        price: "18.75",
        stock: 8,
        image: "https://picsum.photos/seed/wraps/800/800",
    },
    DemoProduct {
        name: "Walnut Serving Board",
        description: "Oiled walnut, juice groove on one side.",
        price: "1249.00",
        stock: 3,
        image: "https://picsum.photos/seed/board/800/800",
    },
    DemoProduct {
        name: "Enamel Mug",
        description: "Speckled enamel, 350ml.",
        price: "10.99",
        stock: 0,
        image: "https://picsum.photos/seed/mug/800/800",
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let mut created = 0;
    for demo in DEMO_PRODUCTS {
        if ensure_product(&orm, demo).await? {
            created += 1;
        }
    }

    tracing::info!(created, total = DEMO_PRODUCTS.len(), "seed completed");
    Ok(())
}

/// Inserts the product unless one with the same name exists.
async fn ensure_product(orm: &OrmConn, demo: &DemoProduct) -> anyhow::Result<bool> {
    let existing = Products::find()
        .filter(products::Column::Name.eq(demo.name))
        .one(orm)
        .await?;
    if existing.is_some() {
        return Ok(false);
    }

    let price: Money = demo.price.parse()?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let product = products::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(demo.name.to_string()),
        description: Set(Some(demo.description.to_string())),
        price_cents: Set(price.cents()),
        stock_quantity: Set(demo.stock),
        images: Set(json!([
            { "url": demo.image, "alt": demo.name, "is_primary": true, "order": 0 }
        ])),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(orm)
    .await?;

    tracing::info!(product_id = %product.id, name = %product.name, price = %price.format_price(), "product seeded");
    Ok(true)
}
