use mongodb::{
    bson::doc,
    options::IndexOptions,
    Database, IndexModel,
};

use crate::models::session::Session;
use crate::models::user::User;

/// Unique sparse indexes backing the identifier invariants: email, phone and
/// referral_code are optional per user but globally unique once set.
pub async fn ensure_indexes(db: &Database) -> mongodb::error::Result<()> {
    let users = db.collection::<User>("users");

    for field in ["email", "phone", "referral_code"] {
        let model = IndexModel::builder()
            .keys(doc! { field: 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .sparse(true)
                    .build(),
            )
            .build();
        users.create_index(model).await?;
    }

    let sessions = db.collection::<Session>("sessions");
    let token_index = IndexModel::builder()
        .keys(doc! { "token": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();
    sessions.create_index(token_index).await?;

    tracing::info!("✅ Database indexes ensured");
    Ok(())
}
