use futures::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::{bson::doc, Client, Collection};
use tracing::debug;

use crate::error::AppError;
use crate::schemas::{Expense, Trip};

/// Read side of the trip backend's collections.
#[derive(Clone, Debug)]
pub struct TripStore {
    trips: Collection<Trip>,
    expenses: Collection<Expense>,
}

impl TripStore {
    pub fn new(client: &Client, database: &str) -> Self {
        let database = client.database(database);
        TripStore {
            trips: database.collection("Trips"),
            expenses: database.collection("Expenses"),
        }
    }

    pub async fn trip(&self, id: &str) -> Result<Trip, AppError> {
        self.trips
            .find_one(doc! { "id": id }, None)
            .await?
            .ok_or_else(|| AppError::TripNotFound(id.to_owned()))
    }

    /// The trip's expenses in the order they were recorded.
    pub async fn expenses(&self, trip_id: &str) -> Result<Vec<Expense>, AppError> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let expenses: Vec<Expense> = self
            .expenses
            .find(doc! { "trip": trip_id }, options)
            .await?
            .try_collect()
            .await?;
        debug!(trip = trip_id, expenses = expenses.len(), "loaded expenses");
        Ok(expenses)
    }

    pub async fn trip_with_expenses(&self, id: &str) -> Result<(Trip, Vec<Expense>), AppError> {
        let trip = self.trip(id).await?;
        let expenses = self.expenses(&trip.id).await?;
        Ok((trip, expenses))
    }
}
