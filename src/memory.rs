//! In-process implementation of the repositories, used by `AppState::fake` and tests.
//! Mirrors the Postgres queries: soft-deleted rows stay stored but are skipped by reads.

use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{dto::NewUser, repo::UserRepository, repo_types::User},
    error::UniqueViolation,
    categories::{
        dto::{CategoryChanges, NewCategory},
        repo::CategoryRepository,
        repo_types::Category,
    },
    pagination::PageRequest,
    products::{
        repo::{ProductInsert, ProductRepository, ProductUpdate},
        repo_types::{Product, ProductWithCategory},
    },
};

/// Rows keep their insertion sequence so that equal `created_at` values still order
/// newest first.
#[derive(Default)]
struct Tables {
    seq: u64,
    users: Vec<User>,
    categories: Vec<(u64, Category)>,
    products: Vec<(u64, Product)>,
}

impl Tables {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn live_category(&self, id: Uuid) -> Option<&Category> {
        self.categories
            .iter()
            .map(|(_, c)| c)
            .find(|c| c.id == id && !c.is_deleted())
    }

    fn with_category(&self, product: &Product) -> ProductWithCategory {
        let category = self.live_category(product.category_id);
        ProductWithCategory {
            product: product.clone(),
            category_ref_id: category.map(|c| c.id),
            category_name: category.map(|c| c.name.clone()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

fn matches_filter(name: &str, filter: Option<&str>) -> bool {
    filter.map_or(true, |f| name.to_lowercase().contains(&f.to_lowercase()))
}

fn newest_first<T>(rows: &mut [(u64, T)], created_at: impl Fn(&T) -> OffsetDateTime) {
    rows.sort_by(|(sa, a), (sb, b)| created_at(b).cmp(&created_at(a)).then(sb.cmp(sa)));
}

fn page_of<T>(rows: Vec<T>, page: PageRequest) -> Vec<T> {
    rows.into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(page.limit as usize)
        .collect()
}

impl MemoryStore {
    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| anyhow!("memory store lock poisoned"))
    }

    /// Raw category row, soft-deleted or not.
    pub fn category_row(&self, id: Uuid) -> Option<Category> {
        let tables = self.tables.lock().ok()?;
        tables
            .categories
            .iter()
            .find(|(_, c)| c.id == id)
            .map(|(_, c)| c.clone())
    }

    /// Raw product row, soft-deleted or not.
    pub fn product_row(&self, id: Uuid) -> Option<Product> {
        let tables = self.tables.lock().ok()?;
        tables
            .products
            .iter()
            .find(|(_, p)| p.id == id)
            .map(|(_, p)| p.clone())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: &NewUser, password_hash: &str) -> anyhow::Result<User> {
        let mut tables = self.lock()?;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(UniqueViolation::new("users_email_key").into());
        }
        let row = User {
            id: Uuid::new_v4(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: password_hash.to_string(),
            token: None,
            created_at: OffsetDateTime::now_utc(),
            created_by: None,
            modified_at: None,
            modified_by: None,
            deleted_at: None,
            deleted_by: None,
        };
        tables.users.push(row.clone());
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email == email && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .iter()
            .find(|u| u.token.as_deref() == Some(token) && u.deleted_at.is_none())
            .cloned())
    }

    async fn count_by_email(&self, email: &str) -> anyhow::Result<i64> {
        let tables = self.lock()?;
        Ok(tables.users.iter().filter(|u| u.email == email).count() as i64)
    }

    async fn set_token(&self, id: Uuid, token: &str) -> anyhow::Result<()> {
        let mut tables = self.lock()?;
        if let Some(user) = tables
            .users
            .iter_mut()
            .find(|u| u.id == id && u.deleted_at.is_none())
        {
            user.token = Some(token.to_string());
            user.modified_at = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn create(&self, category: &NewCategory, actor: Uuid) -> anyhow::Result<Category> {
        let mut tables = self.lock()?;
        if tables
            .categories
            .iter()
            .any(|(_, c)| c.name == category.name && !c.is_deleted())
        {
            return Err(UniqueViolation::new("categories_live_name_key").into());
        }
        let row = Category {
            id: Uuid::new_v4(),
            name: category.name.clone(),
            created_at: OffsetDateTime::now_utc(),
            created_by: Some(actor),
            modified_at: None,
            modified_by: None,
            deleted_at: None,
            deleted_by: None,
        };
        let seq = tables.next_seq();
        tables.categories.push((seq, row.clone()));
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Category>> {
        let tables = self.lock()?;
        Ok(tables.live_category(id).cloned())
    }

    async fn find_many(
        &self,
        name_filter: Option<&str>,
        page: PageRequest,
    ) -> anyhow::Result<Vec<Category>> {
        let tables = self.lock()?;
        let mut rows: Vec<(u64, Category)> = tables
            .categories
            .iter()
            .filter(|(_, c)| !c.is_deleted() && matches_filter(&c.name, name_filter))
            .cloned()
            .collect();
        newest_first(&mut rows, |c| c.created_at);
        Ok(page_of(rows.into_iter().map(|(_, c)| c).collect(), page))
    }

    async fn count(&self, name_filter: Option<&str>) -> anyhow::Result<i64> {
        let tables = self.lock()?;
        Ok(tables
            .categories
            .iter()
            .filter(|(_, c)| !c.is_deleted() && matches_filter(&c.name, name_filter))
            .count() as i64)
    }

    async fn count_by_name(&self, name: &str, exclude: Option<Uuid>) -> anyhow::Result<i64> {
        let tables = self.lock()?;
        Ok(tables
            .categories
            .iter()
            .filter(|(_, c)| c.name == name && !c.is_deleted() && Some(c.id) != exclude)
            .count() as i64)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &CategoryChanges,
        actor: Uuid,
    ) -> anyhow::Result<u64> {
        let mut tables = self.lock()?;
        if let Some(name) = &changes.name {
            if tables
                .categories
                .iter()
                .any(|(_, c)| c.id != id && c.name == *name && !c.is_deleted())
            {
                return Err(UniqueViolation::new("categories_live_name_key").into());
            }
        }
        let Some((_, row)) = tables
            .categories
            .iter_mut()
            .find(|(_, c)| c.id == id && !c.is_deleted())
        else {
            return Ok(0);
        };
        if let Some(name) = &changes.name {
            row.name = name.clone();
        }
        row.modified_by = Some(actor);
        row.modified_at = Some(OffsetDateTime::now_utc());
        Ok(1)
    }

    async fn stamp_deleted_by(&self, id: Uuid, actor: Uuid) -> anyhow::Result<u64> {
        let mut tables = self.lock()?;
        let Some((_, row)) = tables
            .categories
            .iter_mut()
            .find(|(_, c)| c.id == id && !c.is_deleted())
        else {
            return Ok(0);
        };
        row.deleted_by = Some(actor);
        row.modified_at = Some(OffsetDateTime::now_utc());
        Ok(1)
    }

    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<u64> {
        let mut tables = self.lock()?;
        let Some((_, row)) = tables
            .categories
            .iter_mut()
            .find(|(_, c)| c.id == id && !c.is_deleted())
        else {
            return Ok(0);
        };
        row.deleted_at = Some(OffsetDateTime::now_utc());
        Ok(1)
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn create(&self, product: &ProductInsert, actor: Uuid) -> anyhow::Result<Product> {
        let mut tables = self.lock()?;
        if !tables.categories.iter().any(|(_, c)| c.id == product.category_id) {
            anyhow::bail!("insert on table \"products\" violates foreign key constraint");
        }
        let row = Product {
            id: Uuid::new_v4(),
            name: product.name.clone(),
            price: (product.price * 100.0).round() / 100.0,
            stock: product.stock,
            category_id: product.category_id,
            created_at: OffsetDateTime::now_utc(),
            created_by: Some(actor),
            modified_at: None,
            modified_by: None,
            deleted_at: None,
            deleted_by: None,
        };
        let seq = tables.next_seq();
        tables.products.push((seq, row.clone()));
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let tables = self.lock()?;
        Ok(tables
            .products
            .iter()
            .find(|(_, p)| p.id == id && p.deleted_at.is_none())
            .map(|(_, p)| p.clone()))
    }

    async fn find_with_category(&self, id: Uuid) -> anyhow::Result<Option<ProductWithCategory>> {
        let tables = self.lock()?;
        Ok(tables
            .products
            .iter()
            .find(|(_, p)| p.id == id && p.deleted_at.is_none())
            .map(|(_, p)| tables.with_category(p)))
    }

    async fn find_many(&self, page: PageRequest) -> anyhow::Result<Vec<ProductWithCategory>> {
        let tables = self.lock()?;
        let mut rows: Vec<(u64, Product)> = tables
            .products
            .iter()
            .filter(|(_, p)| p.deleted_at.is_none())
            .cloned()
            .collect();
        newest_first(&mut rows, |p| p.created_at);
        let rows = rows.iter().map(|(_, p)| tables.with_category(p)).collect();
        Ok(page_of(rows, page))
    }

    async fn count(&self) -> anyhow::Result<i64> {
        let tables = self.lock()?;
        Ok(tables
            .products
            .iter()
            .filter(|(_, p)| p.deleted_at.is_none())
            .count() as i64)
    }

    async fn update(&self, id: Uuid, changes: &ProductUpdate, actor: Uuid) -> anyhow::Result<u64> {
        let mut tables = self.lock()?;
        let Some((_, row)) = tables
            .products
            .iter_mut()
            .find(|(_, p)| p.id == id && p.deleted_at.is_none())
        else {
            return Ok(0);
        };
        if let Some(name) = &changes.name {
            row.name = name.clone();
        }
        if let Some(price) = changes.price {
            row.price = (price * 100.0).round() / 100.0;
        }
        if let Some(stock) = changes.stock {
            row.stock = stock;
        }
        if let Some(category_id) = changes.category_id {
            row.category_id = category_id;
        }
        row.modified_by = Some(actor);
        row.modified_at = Some(OffsetDateTime::now_utc());
        Ok(1)
    }

    async fn stamp_deleted_by(&self, id: Uuid, actor: Uuid) -> anyhow::Result<u64> {
        let mut tables = self.lock()?;
        let Some((_, row)) = tables
            .products
            .iter_mut()
            .find(|(_, p)| p.id == id && p.deleted_at.is_none())
        else {
            return Ok(0);
        };
        row.deleted_by = Some(actor);
        row.modified_at = Some(OffsetDateTime::now_utc());
        Ok(1)
    }

    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<u64> {
        let mut tables = self.lock()?;
        let Some((_, row)) = tables
            .products
            .iter_mut()
            .find(|(_, p)| p.id == id && p.deleted_at.is_none())
        else {
            return Ok(0);
        };
        row.deleted_at = Some(OffsetDateTime::now_utc());
        Ok(1)
    }
}
