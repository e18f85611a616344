use serde::Deserialize;

use crate::client::{ApiClient, MultipartForm, RequestOptions};
use crate::entities::booking::{Booking, BookingStatus, BookingStatusUpdate};
use crate::entities::car::{Car, CarForm, CarStatus, CarStatusUpdate};
use crate::entities::dashboard::DashboardData;
use crate::entities::message::{ContactMessage, MessageStatus, MessageStatusUpdate};
use crate::entities::review::{ClientReview, ClientReviewForm, Review, ReviewSearchField, ReviewsResponse};
use crate::entities::user::User;
use crate::entities::{Ack, DataEnvelope};
use crate::error::{AppError, AppResult};
use crate::routes::endpoints;

#[derive(Debug, Deserialize)]
struct CarSaved {
    #[serde(default)]
    success: bool,
    car: Option<Car>,
    data: Option<Car>,
    #[serde(default)]
    message: Option<String>,
}

/// Back-office CRUD. Every call carries the admin token.
pub struct AdminApi<'a> {
    client: &'a ApiClient,
}

fn opts() -> RequestOptions {
    RequestOptions::admin()
}

/// Turn an `{ success: false, message }` body into an error.
fn require_success(ack: Ack, fallback: &str) -> AppResult<Ack> {
    if ack.success {
        Ok(ack)
    } else {
        Err(AppError::BadRequest(
            ack.message.unwrap_or_else(|| fallback.to_string()),
        ))
    }
}

fn unwrap_data<T>(resp: DataEnvelope<T>, fallback: &str) -> AppResult<T> {
    match resp.data {
        Some(data) if resp.success => Ok(data),
        _ => Err(AppError::BadRequest(
            resp.message.unwrap_or_else(|| fallback.to_string()),
        )),
    }
}

impl<'a> AdminApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    // ============ Dashboard ============

    /// Missing counters come back as zero.
    pub async fn dashboard(&self) -> AppResult<DashboardData> {
        let resp: DataEnvelope<DashboardData> = self.client.get(endpoints::ADMIN_DASHBOARD, &opts()).await?;
        Ok(resp.data.unwrap_or_default())
    }

    // ============ Cars ============

    pub async fn list_cars(&self) -> AppResult<Vec<Car>> {
        let resp: DataEnvelope<Vec<Car>> = self.client.get(endpoints::CARS, &opts()).await?;
        Ok(resp.data.unwrap_or_default())
    }

    pub async fn create_car(&self, form: &CarForm) -> AppResult<Car> {
        form.validate()?;
        let resp: CarSaved = self
            .client
            .post_multipart(endpoints::CARS, car_multipart(form), &opts())
            .await?;
        saved_car(resp, "Failed to add car")
    }

    pub async fn update_car(&self, id: &str, form: &CarForm) -> AppResult<Car> {
        form.validate()?;
        let resp: CarSaved = self
            .client
            .put_multipart(&endpoints::car(id), car_multipart(form), &opts())
            .await?;
        saved_car(resp, "Failed to update car")
    }

    pub async fn set_car_status(&self, id: &str, status: CarStatus) -> AppResult<Ack> {
        self.client
            .put(&endpoints::car_status(id), &CarStatusUpdate { status }, &opts())
            .await
    }

    pub async fn delete_car(&self, id: &str) -> AppResult<Ack> {
        self.client.delete(&endpoints::car(id), &opts()).await
    }

    // ============ Bookings ============

    pub async fn list_bookings(&self) -> AppResult<Vec<Booking>> {
        let resp: DataEnvelope<Vec<Booking>> = self.client.get(endpoints::ADMIN_BOOKINGS, &opts()).await?;
        if !resp.success {
            return Err(AppError::BadRequest(
                resp.message.unwrap_or_else(|| "Failed to fetch bookings".to_string()),
            ));
        }
        Ok(resp.data.unwrap_or_default())
    }

    pub async fn set_booking_status(&self, id: &str, status: BookingStatus) -> AppResult<Booking> {
        let resp: DataEnvelope<Booking> = self
            .client
            .put(&endpoints::booking_status(id), &BookingStatusUpdate::status(status), &opts())
            .await?;
        unwrap_data(resp, "Failed to update booking status")
    }

    pub async fn delete_booking(&self, id: &str) -> AppResult<Ack> {
        let ack = self.client.delete(&endpoints::booking(id), &opts()).await?;
        require_success(ack, "Failed to delete booking")
    }

    // ============ Users ============

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.client.get(endpoints::USERS, &opts()).await
    }

    pub async fn toggle_user_block(&self, id: &str) -> AppResult<Ack> {
        let ack = self.client.put_empty(&endpoints::toggle_block(id), &opts()).await?;
        require_success(ack, "Failed to update user")
    }

    pub async fn delete_user(&self, id: &str) -> AppResult<Ack> {
        self.client.delete(&endpoints::user(id), &opts()).await
    }

    // ============ Reviews ============

    pub async fn list_reviews(&self) -> AppResult<Vec<Review>> {
        let resp: ReviewsResponse = self.client.get(endpoints::REVIEWS, &opts()).await?;
        Ok(resp.reviews)
    }

    /// An empty term lists everything.
    pub async fn search_reviews(&self, term: &str, field: ReviewSearchField) -> AppResult<Vec<Review>> {
        let term = term.trim();
        if term.is_empty() {
            return self.list_reviews().await;
        }
        let search = opts().query("term", term).query("type", field.as_str());
        let resp: ReviewsResponse = self.client.get(endpoints::REVIEW_SEARCH, &search).await?;
        Ok(resp.reviews)
    }

    pub async fn delete_review(&self, id: &str) -> AppResult<Ack> {
        self.client.delete(&endpoints::review(id), &opts()).await
    }

    // ============ Client testimonials ============

    pub async fn list_client_reviews(&self) -> AppResult<Vec<ClientReview>> {
        let resp: DataEnvelope<Vec<ClientReview>> = self.client.get(endpoints::CLIENT_REVIEWS, &opts()).await?;
        Ok(resp.data.unwrap_or_default())
    }

    pub async fn create_client_review(&self, form: &ClientReviewForm) -> AppResult<ClientReview> {
        form.validate()?;
        let resp: DataEnvelope<ClientReview> = self
            .client
            .post_multipart(endpoints::CLIENT_REVIEWS, client_review_multipart(form), &opts())
            .await?;
        unwrap_data(resp, "Failed to add client review")
    }

    pub async fn update_client_review(&self, id: &str, form: &ClientReviewForm) -> AppResult<ClientReview> {
        form.validate()?;
        let resp: DataEnvelope<ClientReview> = self
            .client
            .put_multipart(&endpoints::client_review(id), client_review_multipart(form), &opts())
            .await?;
        unwrap_data(resp, "Failed to update client review")
    }

    pub async fn toggle_client_review(&self, id: &str) -> AppResult<ClientReview> {
        let resp: DataEnvelope<ClientReview> = self
            .client
            .put_empty(&endpoints::toggle_client_review(id), &opts())
            .await?;
        unwrap_data(resp, "Failed to update client review")
    }

    pub async fn delete_client_review(&self, id: &str) -> AppResult<Ack> {
        let ack = self.client.delete(&endpoints::client_review(id), &opts()).await?;
        require_success(ack, "Failed to delete client review")
    }

    // ============ Messages ============

    pub async fn list_messages(&self) -> AppResult<Vec<ContactMessage>> {
        let resp: DataEnvelope<Vec<ContactMessage>> = self.client.get(endpoints::MESSAGES, &opts()).await?;
        Ok(resp.data.unwrap_or_default())
    }

    pub async fn set_message_status(
        &self,
        id: &str,
        status: MessageStatus,
        response: Option<String>,
    ) -> AppResult<ContactMessage> {
        let body = MessageStatusUpdate { status, response };
        let resp: DataEnvelope<ContactMessage> = self
            .client
            .put(&endpoints::message_status(id), &body, &opts())
            .await?;
        unwrap_data(resp, "Failed to update message")
    }

    pub async fn delete_message(&self, id: &str) -> AppResult<Ack> {
        let ack = self.client.delete(&endpoints::message(id), &opts()).await?;
        require_success(ack, "Failed to delete message")
    }
}

fn car_multipart(form: &CarForm) -> MultipartForm {
    let mut multipart = form
        .text_fields()
        .into_iter()
        .fold(MultipartForm::new(), |m, (name, value)| m.text(name, value));
    for image in &form.images {
        multipart = multipart.file("images", image.clone());
    }
    multipart
}

fn client_review_multipart(form: &ClientReviewForm) -> MultipartForm {
    let mut multipart = MultipartForm::new()
        .text("name", form.name.trim())
        .text("review", form.review.trim())
        .text("rating", form.rating.to_string());
    if let Some(logo) = &form.logo {
        multipart = multipart.file("logo", logo.clone());
    }
    multipart
}

fn saved_car(resp: CarSaved, fallback: &str) -> AppResult<Car> {
    match resp.car.or(resp.data) {
        Some(car) => Ok(car),
        None if !resp.success => Err(AppError::BadRequest(
            resp.message.unwrap_or_else(|| fallback.to_string()),
        )),
        None => Err(AppError::Decode("car missing from response".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Upload;

    #[test]
    fn test_car_multipart_carries_fields_and_images() {
        let form = CarForm {
            name: "Swift".to_string(),
            brand: "Suzuki".to_string(),
            seats: 5,
            price: 3000.0,
            images: vec![Upload::new("front.jpg", "image/jpeg", vec![0; 4])],
            ..CarForm::default()
        };
        let multipart = car_multipart(&form);
        assert_eq!(multipart.field("seats"), Some("5"));
        assert_eq!(multipart.field("price"), Some("3000"));
        assert_eq!(multipart.file_count(), 1);
    }
}
