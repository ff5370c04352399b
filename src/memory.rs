use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserStore,
        repo_types::{NewUser, User},
    },
    cars::{
        repo::CarStore,
        repo_types::{Car, CarPatch, NewCar},
    },
    error::RepoError,
};

/// In-process store used when no `DATABASE_URL` is configured, and by tests.
/// Uniqueness is checked under the write lock, so concurrent signups with the
/// same email or username cannot both succeed.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    cars: RwLock<Vec<Car>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    #[cfg(test)]
    pub async fn car_count(&self) -> usize {
        self.cars.read().await.len()
    }
}

fn matches_keyword(car: &Car, needle: &str) -> bool {
    let hit = |s: &str| s.to_lowercase().contains(needle);
    hit(&car.company)
        || hit(&car.model)
        || car.description.as_deref().is_some_and(hit)
        || car.tags.iter().any(|t| hit(t))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        let email = user.email.to_lowercase();
        if users.iter().any(|u| u.email == email) {
            return Err(RepoError::Duplicate("email"));
        }
        if users.iter().any(|u| u.username == user.username) {
            return Err(RepoError::Duplicate("username"));
        }
        let row = User {
            id: Uuid::new_v4(),
            fullname: user.fullname,
            username: user.username,
            email,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(row.clone());
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let email = email.to_lowercase();
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, RepoError> {
        let email = login.to_lowercase();
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.email == email || u.username == login)
            .cloned())
    }
}

#[async_trait]
impl CarStore for MemoryStore {
    async fn insert(&self, car: NewCar) -> Result<Car, RepoError> {
        let row = Car {
            id: Uuid::new_v4(),
            user_id: car.user_id,
            company: car.company,
            model: car.model,
            description: car.description,
            images: car.images,
            tags: car.tags,
            created_at: OffsetDateTime::now_utc(),
        };
        self.cars.write().await.push(row.clone());
        Ok(row)
    }

    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Car>, RepoError> {
        let cars = self.cars.read().await;
        Ok(cars.iter().filter(|c| c.user_id == owner).cloned().collect())
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Car>, RepoError> {
        let needle = keyword.to_lowercase();
        let cars = self.cars.read().await;
        Ok(cars
            .iter()
            .filter(|c| matches_keyword(c, &needle))
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Car>, RepoError> {
        let cars = self.cars.read().await;
        Ok(cars.iter().find(|c| c.id == id).cloned())
    }

    async fn update(&self, id: Uuid, patch: CarPatch) -> Result<Option<Car>, RepoError> {
        let mut cars = self.cars.write().await;
        Ok(cars.iter_mut().find(|c| c.id == id).map(|car| {
            patch.apply(car);
            car.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut cars = self.cars.write().await;
        let before = cars.len();
        cars.retain(|c| c.id != id);
        Ok(cars.len() != before)
    }
}
