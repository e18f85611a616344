use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, RequestOptions};
use crate::entities::booking::{Booking, BookingResponse, CreateBookingRequest};
use crate::entities::car::{Car, CarResponse};
use crate::entities::message::NewMessage;
use crate::entities::review::{CanReviewResponse, ClientReview, Review, ReviewRequest, ReviewSubmitted, ReviewsResponse};
use crate::entities::user::{ProfileResponse, ProfileUpdate, User};
use crate::entities::{Ack, DataEnvelope};
use crate::error::{AppError, AppResult};
use crate::routes::endpoints;

#[derive(Debug, Deserialize)]
struct WishlistItem {
    car: Option<Car>,
}

#[derive(Debug, Deserialize)]
struct WishlistResponse {
    #[serde(default)]
    wishlist: Vec<WishlistItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WishlistAdd<'a> {
    car_id: &'a str,
}

/// Endpoints used by the customer pages.
pub struct CustomerApi<'a> {
    client: &'a ApiClient,
}

impl<'a> CustomerApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    fn user() -> RequestOptions {
        RequestOptions::user()
    }

    // ============ Cars ============

    pub async fn list_cars(&self) -> AppResult<Vec<Car>> {
        let resp: DataEnvelope<Vec<Car>> = self
            .client
            .get(endpoints::CARS, &RequestOptions::public())
            .await?;
        Ok(resp.data.unwrap_or_default())
    }

    /// Cars a customer can book right now.
    pub async fn available_cars(&self) -> AppResult<Vec<Car>> {
        Ok(self
            .list_cars()
            .await?
            .into_iter()
            .filter(Car::is_available)
            .collect())
    }

    pub async fn get_car(&self, id: &str) -> AppResult<Car> {
        let resp: CarResponse = self
            .client
            .get(&endpoints::car(id), &RequestOptions::public())
            .await?;
        Ok(resp.car)
    }

    // ============ Bookings ============

    pub async fn create_booking(&self, req: &CreateBookingRequest) -> AppResult<BookingResponse> {
        self.client.post(endpoints::BOOKINGS, req, &Self::user()).await
    }

    pub async fn get_booking(&self, id: &str) -> AppResult<Booking> {
        let resp: BookingResponse = self.client.get(&endpoints::booking(id), &Self::user()).await?;
        resp.booking
            .ok_or_else(|| AppError::NotFound(resp.message.unwrap_or_else(|| "Booking not found".to_string())))
    }

    /// The signed-in user's bookings, newest first.
    pub async fn my_bookings(&self) -> AppResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .client
            .get(endpoints::USER_BOOKINGS, &Self::user())
            .await?;
        sort_newest_first(&mut bookings);
        Ok(bookings)
    }

    pub async fn cancel_booking(&self, id: &str) -> AppResult<Ack> {
        self.client
            .put_empty(&endpoints::cancel_booking(id), &Self::user())
            .await
    }

    // ============ Reviews ============

    pub async fn car_reviews(&self, car_id: &str) -> AppResult<Vec<Review>> {
        let resp: ReviewsResponse = self
            .client
            .get(&endpoints::car_reviews(car_id), &RequestOptions::public())
            .await?;
        Ok(resp.reviews)
    }

    pub async fn can_review(&self, car_id: &str) -> AppResult<bool> {
        let resp: CanReviewResponse = self
            .client
            .get(&endpoints::can_review(car_id), &Self::user())
            .await?;
        Ok(resp.can_review)
    }

    pub async fn review_car(&self, car_id: &str, review: &ReviewRequest) -> AppResult<ReviewSubmitted> {
        self.client
            .post(&endpoints::submit_car_review(car_id), review, &Self::user())
            .await
    }

    pub async fn review_driver(&self, driver_id: &str, review: &ReviewRequest) -> AppResult<Ack> {
        let ack: Ack = self
            .client
            .post(&endpoints::driver_review(driver_id), review, &Self::user())
            .await?;
        if !ack.success {
            return Err(AppError::BadRequest(
                ack.message
                    .unwrap_or_else(|| "Failed to submit driver review".to_string()),
            ));
        }
        Ok(ack)
    }

    pub async fn testimonials(&self) -> AppResult<Vec<ClientReview>> {
        let resp: DataEnvelope<Vec<ClientReview>> = self
            .client
            .get(endpoints::PUBLIC_CLIENT_REVIEWS, &RequestOptions::public())
            .await?;
        Ok(resp.data.unwrap_or_default())
    }

    // ============ Wishlist ============

    pub async fn wishlist(&self) -> AppResult<Vec<Car>> {
        let resp: WishlistResponse = self.client.get(endpoints::WISHLIST, &Self::user()).await?;
        Ok(resp.wishlist.into_iter().filter_map(|item| item.car).collect())
    }

    pub async fn add_to_wishlist(&self, car_id: &str) -> AppResult<Ack> {
        self.client
            .post(endpoints::WISHLIST, &WishlistAdd { car_id }, &Self::user())
            .await
    }

    pub async fn remove_from_wishlist(&self, car_id: &str) -> AppResult<Ack> {
        self.client
            .delete(&endpoints::wishlist_item(car_id), &Self::user())
            .await
    }

    // ============ Profile & contact ============

    pub async fn profile(&self) -> AppResult<User> {
        let resp: ProfileResponse = self.client.get(endpoints::PROFILE, &Self::user()).await?;
        resp.into_user()
            .ok_or_else(|| AppError::Decode("profile response did not include the user".to_string()))
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> AppResult<User> {
        let resp: ProfileResponse = self.client.put(endpoints::PROFILE, update, &Self::user()).await?;
        if !resp.success {
            return Err(AppError::BadRequest(
                resp.message.unwrap_or_else(|| "Failed to update profile".to_string()),
            ));
        }
        resp.into_user()
            .ok_or_else(|| AppError::Decode("profile response did not include the user".to_string()))
    }

    pub async fn send_message(&self, message: &NewMessage) -> AppResult<Ack> {
        message.validate()?;
        let ack: Ack = self
            .client
            .post(endpoints::MESSAGES, message, &RequestOptions::public())
            .await?;
        if !ack.success {
            return Err(AppError::BadRequest(
                ack.message.unwrap_or_else(|| "Something went wrong".to_string()),
            ));
        }
        Ok(ack)
    }
}

/// Bookings without a creation time sort last.
pub fn sort_newest_first(bookings: &mut [Booking]) {
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(id: &str, created_at: Option<&str>) -> Booking {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "startDate": "2026-03-01T00:00:00Z",
            "endDate": "2026-03-02T00:00:00Z",
            "status": "pending",
            "totalAmount": 1000,
            "createdAt": created_at,
        }))
        .unwrap()
    }

    #[test]
    fn test_sort_newest_first() {
        let mut bookings = vec![
            booking("old", Some("2026-01-01T00:00:00Z")),
            booking("none", None),
            booking("new", Some("2026-02-01T00:00:00Z")),
        ];
        sort_newest_first(&mut bookings);
        let ids: Vec<&str> = bookings.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "none"]);
    }
}
