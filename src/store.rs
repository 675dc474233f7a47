use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::{
    entities::resource,
    error::AppResult,
    models::{ListParams, NewResource, ViewKind},
};

#[derive(Clone)]
pub struct ResourceStore {
    db: DatabaseConnection,
}

impl ResourceStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn list(&self, params: &ListParams) -> AppResult<(u64, Vec<resource::Model>)> {
        let cond = filter_condition(&params.search, params.view);

        // Count and page slice share one condition so the total always matches
        // the predicate behind the returned rows.
        let total = resource::Entity::find().filter(cond.clone()).count(&self.db).await?;

        let rows = resource::Entity::find()
            .filter(cond)
            .order_by_desc(resource::Column::CreatedAt)
            .order_by_desc(resource::Column::Id)
            .limit(params.limit)
            .offset(params.offset())
            .all(&self.db)
            .await?;

        Ok((total, rows))
    }

    pub async fn insert_one(&self, item: NewResource) -> AppResult<resource::Model> {
        let model = active_model(item, now_sec()).insert(&self.db).await?;
        Ok(model)
    }

    pub async fn insert_batch(&self, items: Vec<NewResource>) -> AppResult<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let now = now_sec();
        let count = items.len();

        // Dropping an uncommitted transaction rolls it back, so any failed
        // insert discards the whole batch.
        let txn = self.db.begin().await?;
        for item in items {
            resource::Entity::insert(active_model(item, now)).exec(&txn).await?;
        }
        txn.commit().await?;

        Ok(count)
    }

    pub async fn exists_by_image_url(&self, url: &str) -> AppResult<bool> {
        let found = resource::Entity::find()
            .filter(resource::Column::ImageUrl.eq(url))
            .one(&self.db)
            .await?;
        Ok(found.is_some())
    }

    pub async fn delete_by_id(&self, id: i32) -> AppResult<()> {
        resource::Entity::delete_many()
            .filter(resource::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}

fn filter_condition(search: &str, view: Option<ViewKind>) -> Condition {
    let mut cond = Condition::all();

    if !search.is_empty() {
        cond = cond.add(
            Condition::any()
                .add(resource::Column::MovieName.contains(search))
                .add(resource::Column::Title.contains(search)),
        );
    }

    match view {
        Some(ViewKind::Images) => {
            cond = cond
                .add(resource::Column::ImageUrl.is_not_null())
                .add(resource::Column::ImageUrl.ne(""));
        }
        Some(ViewKind::Titles) => {
            cond = cond
                .add(resource::Column::Title.is_not_null())
                .add(resource::Column::Title.ne(""));
        }
        None => {}
    }

    cond
}

fn active_model(item: NewResource, created_at: i64) -> resource::ActiveModel {
    resource::ActiveModel {
        id: Default::default(),
        movie_name: Set(item.movie_name),
        title: Set(item.title),
        image_url: Set(item.image_url),
        views: Set(item.views),
        created_at: Set(created_at),
    }
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}
