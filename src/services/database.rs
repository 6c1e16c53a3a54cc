use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    collection_box::{CollectionBox, CreateBoxRequest},
    common::RecordRef,
    donation::Donation,
    donor::{CreateDonorRequest, Donor},
    notification::Notification,
    subscription::{CreateSubscriptionRequest, Subscription},
    volunteer::{CreateVolunteerRequest, Volunteer},
};

/// In-process record store shared by every worker. Payment recording takes
/// the donations lock before the target table's lock.
#[derive(Clone, Default)]
pub struct DatabaseService {
    donors: Arc<Mutex<Vec<Donor>>>,
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
    boxes: Arc<Mutex<Vec<CollectionBox>>>,
    volunteers: Arc<Mutex<Vec<Volunteer>>>,
    donations: Arc<Mutex<Vec<Donation>>>,
    notifications: Arc<Mutex<Vec<Notification>>>,
}

fn lock<T>(table: &Mutex<T>) -> Result<MutexGuard<'_, T>, AppError> {
    table
        .lock()
        .map_err(|_| AppError::Storage("storage lock poisoned".to_string()))
}

impl DatabaseService {
    pub fn new() -> Self {
        Self::default()
    }

    // Donor operations
    pub fn create_donor(&self, request: CreateDonorRequest) -> Result<Donor, AppError> {
        let donor = Donor::new(request);
        let mut donors = lock(&self.donors)?;

        if donors.iter().any(|d| d.phone == donor.phone) {
            return Err(AppError::Conflict(format!(
                "Donor with phone {} already exists",
                donor.phone
            )));
        }

        donors.push(donor.clone());
        log::info!("Created donor {} ({})", donor.name, donor.id);
        Ok(donor)
    }

    pub fn get_donor(&self, donor_id: &Uuid) -> Result<Donor, AppError> {
        lock(&self.donors)?
            .iter()
            .find(|d| d.id == *donor_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Donor", donor_id))
    }

    pub fn list_donors(&self) -> Result<Vec<Donor>, AppError> {
        let mut donors = lock(&self.donors)?.clone();
        donors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(donors)
    }

    // Subscription operations
    pub fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
        default_currency: &str,
    ) -> Result<Subscription, AppError> {
        self.get_donor(&request.donor_id)?;
        let subscription = Subscription::new(request, default_currency)?;

        lock(&self.subscriptions)?.push(subscription.clone());
        log::info!(
            "Created {} subscription {} for donor {}",
            subscription.period,
            subscription.id,
            subscription.donor_id
        );
        Ok(subscription)
    }

    pub fn get_subscription(&self, subscription_id: &Uuid) -> Result<Subscription, AppError> {
        let found = lock(&self.subscriptions)?
            .iter()
            .find(|s| s.id == *subscription_id)
            .cloned();

        found.ok_or_else(|| {
            log::debug!("Subscription lookup missed: {}", subscription_id);
            AppError::not_found("Subscription", subscription_id)
        })
    }

    /// Newest first, optionally restricted to one donor.
    pub fn list_subscriptions(&self, donor_id: Option<&Uuid>) -> Result<Vec<Subscription>, AppError> {
        let mut subscriptions: Vec<Subscription> = lock(&self.subscriptions)?
            .iter()
            .filter(|s| donor_id.map_or(true, |id| s.donor_id == *id))
            .cloned()
            .collect();
        subscriptions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(subscriptions)
    }

    pub fn cancel_subscription(&self, subscription_id: &Uuid) -> Result<Subscription, AppError> {
        let mut subscriptions = lock(&self.subscriptions)?;
        let subscription = subscriptions
            .iter_mut()
            .find(|s| s.id == *subscription_id)
            .ok_or_else(|| AppError::not_found("Subscription", subscription_id))?;

        subscription.cancel()?;
        log::info!("Cancelled subscription {}", subscription_id);
        Ok(subscription.clone())
    }

    pub fn record_subscription_payment(
        &self,
        subscription_id: &Uuid,
        donation: Donation,
    ) -> Result<(Donation, Subscription), AppError> {
        let mut donations = lock(&self.donations)?;
        ensure_unique_reference(&donations, &donation)?;

        let mut subscriptions = lock(&self.subscriptions)?;
        let subscription = subscriptions
            .iter_mut()
            .find(|s| s.id == *subscription_id)
            .ok_or_else(|| AppError::not_found("Subscription", subscription_id))?;

        subscription.record_payment(donation.received_at)?;
        donations.push(donation.clone());

        log::info!(
            "Recorded payment {} {} for subscription {}",
            donation.amount,
            donation.currency,
            subscription_id
        );
        Ok((donation, subscription.clone()))
    }

    // Collection box operations
    pub fn create_box(&self, request: CreateBoxRequest) -> Result<CollectionBox, AppError> {
        if let Some(volunteer_id) = &request.volunteer_id {
            self.get_volunteer(volunteer_id)?;
        }
        let collection_box = CollectionBox::new(request)?;

        let mut boxes = lock(&self.boxes)?;
        if boxes.iter().any(|b| b.box_number == collection_box.box_number) {
            return Err(AppError::Conflict(format!(
                "Box number {} is already registered",
                collection_box.box_number
            )));
        }

        boxes.push(collection_box.clone());
        log::info!(
            "Registered box {} with {}",
            collection_box.box_number,
            collection_box.holder_name
        );
        Ok(collection_box)
    }

    pub fn get_box(&self, box_id: &Uuid) -> Result<CollectionBox, AppError> {
        lock(&self.boxes)?
            .iter()
            .find(|b| b.id == *box_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Box", box_id))
    }

    /// Ordered by box number, optionally restricted to one volunteer.
    pub fn list_boxes(&self, volunteer_id: Option<&Uuid>) -> Result<Vec<CollectionBox>, AppError> {
        let mut boxes: Vec<CollectionBox> = lock(&self.boxes)?
            .iter()
            .filter(|b| volunteer_id.map_or(true, |id| b.volunteer_id.as_ref() == Some(id)))
            .cloned()
            .collect();
        boxes.sort_by(|a, b| a.box_number.cmp(&b.box_number));
        Ok(boxes)
    }

    pub fn assign_box(&self, box_id: &Uuid, volunteer_id: &Uuid) -> Result<CollectionBox, AppError> {
        self.get_volunteer(volunteer_id)?;

        let mut boxes = lock(&self.boxes)?;
        let collection_box = boxes
            .iter_mut()
            .find(|b| b.id == *box_id)
            .ok_or_else(|| AppError::not_found("Box", box_id))?;

        collection_box.assign(*volunteer_id);
        log::info!("Assigned box {} to volunteer {}", collection_box.box_number, volunteer_id);
        Ok(collection_box.clone())
    }

    pub fn record_box_collection(
        &self,
        box_id: &Uuid,
        donation: Donation,
    ) -> Result<(Donation, CollectionBox), AppError> {
        let mut donations = lock(&self.donations)?;
        ensure_unique_reference(&donations, &donation)?;

        let mut boxes = lock(&self.boxes)?;
        let collection_box = boxes
            .iter_mut()
            .find(|b| b.id == *box_id)
            .ok_or_else(|| AppError::not_found("Box", box_id))?;

        collection_box.record_collection(donation.received_at)?;
        donations.push(donation.clone());

        log::info!(
            "Recorded collection of {} {} from box {}",
            donation.amount,
            donation.currency,
            collection_box.box_number
        );
        Ok((donation, collection_box.clone()))
    }

    // Volunteer operations
    pub fn create_volunteer(&self, request: CreateVolunteerRequest) -> Result<Volunteer, AppError> {
        let volunteer = Volunteer::new(request);
        let mut volunteers = lock(&self.volunteers)?;

        if volunteers.iter().any(|v| v.phone == volunteer.phone) {
            return Err(AppError::Conflict(format!(
                "Volunteer with phone {} already exists",
                volunteer.phone
            )));
        }

        volunteers.push(volunteer.clone());
        log::info!("Created volunteer {} ({})", volunteer.name, volunteer.id);
        Ok(volunteer)
    }

    pub fn get_volunteer(&self, volunteer_id: &Uuid) -> Result<Volunteer, AppError> {
        lock(&self.volunteers)?
            .iter()
            .find(|v| v.id == *volunteer_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Volunteer", volunteer_id))
    }

    pub fn list_volunteers(&self) -> Result<Vec<Volunteer>, AppError> {
        let mut volunteers = lock(&self.volunteers)?.clone();
        volunteers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(volunteers)
    }

    // Donation operations
    pub fn list_donations(&self, target: Option<&RecordRef>) -> Result<Vec<Donation>, AppError> {
        let mut donations: Vec<Donation> = lock(&self.donations)?
            .iter()
            .filter(|d| target.map_or(true, |t| d.target == *t))
            .cloned()
            .collect();
        donations.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        Ok(donations)
    }

    pub fn find_donation_by_reference(&self, reference: &str) -> Result<Option<Donation>, AppError> {
        Ok(lock(&self.donations)?
            .iter()
            .find(|d| d.gateway_reference.as_deref() == Some(reference))
            .cloned())
    }

    // Notification operations
    pub fn store_notification(&self, notification: Notification) -> Result<Notification, AppError> {
        lock(&self.notifications)?.push(notification.clone());
        Ok(notification)
    }

    pub fn list_notifications(&self) -> Result<Vec<Notification>, AppError> {
        let mut notifications = lock(&self.notifications)?.clone();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    pub fn donor_count(&self) -> Result<usize, AppError> {
        Ok(lock(&self.donors)?.len())
    }

    pub fn volunteer_count(&self) -> Result<usize, AppError> {
        Ok(lock(&self.volunteers)?.len())
    }

    #[cfg(test)]
    pub fn insert_subscription(&self, subscription: Subscription) -> Result<(), AppError> {
        lock(&self.subscriptions)?.push(subscription);
        Ok(())
    }

    #[cfg(test)]
    pub fn insert_box(&self, collection_box: CollectionBox) -> Result<(), AppError> {
        lock(&self.boxes)?.push(collection_box);
        Ok(())
    }
}

fn ensure_unique_reference(donations: &[Donation], donation: &Donation) -> Result<(), AppError> {
    if let Some(reference) = &donation.gateway_reference {
        if donations.iter().any(|d| d.gateway_reference.as_ref() == Some(reference)) {
            return Err(AppError::Conflict(format!(
                "Payment {} has already been recorded",
                reference
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::donation::RecordPaymentRequest;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    fn donor(db: &DatabaseService, phone: &str) -> Donor {
        db.create_donor(CreateDonorRequest {
            name: "Meera Iyer".to_string(),
            phone: phone.to_string(),
            email: None,
        })
        .unwrap()
    }

    fn payment(target: RecordRef, reference: Option<&str>, days_ago: i64) -> Donation {
        let now = Utc::now();
        Donation::new(
            target,
            RecordPaymentRequest {
                amount: Decimal::new(1000, 0),
                currency: None,
                method: None,
                gateway_reference: reference.map(str::to_string),
                received_at: Some(now - Duration::days(days_ago)),
            },
            "INR",
            now,
        )
        .unwrap()
    }

    #[test]
    fn test_donor_operations() {
        let db = DatabaseService::new();
        let created = donor(&db, "9876543210");

        assert_eq!(db.get_donor(&created.id).unwrap().phone, "9876543210");
        assert!(matches!(
            db.create_donor(CreateDonorRequest {
                name: "Someone Else".to_string(),
                phone: "98765 43210".to_string(),
                email: None,
            }),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(db.get_donor(&Uuid::new_v4()), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_subscription_requires_donor() {
        let db = DatabaseService::new();
        let result = db.create_subscription(
            CreateSubscriptionRequest {
                donor_id: Uuid::new_v4(),
                amount: Decimal::new(100, 0),
                currency: None,
                period: "monthly".to_string(),
            },
            "INR",
        );
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_record_subscription_payment() {
        let db = DatabaseService::new();
        let donor = donor(&db, "9876543211");
        let subscription = db
            .create_subscription(
                CreateSubscriptionRequest {
                    donor_id: donor.id,
                    amount: Decimal::new(100, 0),
                    currency: None,
                    period: "weekly".to_string(),
                },
                "INR",
            )
            .unwrap();

        let target = RecordRef::Subscription(subscription.id);
        let (donation, updated) = db
            .record_subscription_payment(&subscription.id, payment(target, Some("pay_001"), 2))
            .unwrap();
        assert!(updated.is_active);
        assert_eq!(updated.last_payment_at, Some(donation.received_at));

        // the same gateway payment cannot be applied twice
        assert!(matches!(
            db.record_subscription_payment(&subscription.id, payment(target, Some("pay_001"), 0)),
            Err(AppError::Conflict(_))
        ));
        assert!(db.find_donation_by_reference("pay_001").unwrap().is_some());
        assert_eq!(db.list_donations(Some(&target)).unwrap().len(), 1);
    }

    #[test]
    fn test_box_assignment_and_collection() {
        let db = DatabaseService::new();
        let volunteer = db
            .create_volunteer(CreateVolunteerRequest {
                name: "Ravi Kumar".to_string(),
                phone: "9000000001".to_string(),
            })
            .unwrap();

        let collection_box = db
            .create_box(CreateBoxRequest {
                box_number: "B-1".to_string(),
                holder_name: "Lakshmi Medicals".to_string(),
                holder_phone: "9000000002".to_string(),
                location: None,
                volunteer_id: None,
                period: Some("monthly".to_string()),
            })
            .unwrap();

        assert!(db.list_boxes(Some(&volunteer.id)).unwrap().is_empty());
        db.assign_box(&collection_box.id, &volunteer.id).unwrap();
        assert_eq!(db.list_boxes(Some(&volunteer.id)).unwrap().len(), 1);

        let target = RecordRef::CollectionBox(collection_box.id);
        let (_, updated) = db
            .record_box_collection(&collection_box.id, payment(target, None, 1))
            .unwrap();
        assert!(updated.is_active);
        assert!(matches!(
            db.assign_box(&collection_box.id, &Uuid::new_v4()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_box_number() {
        let db = DatabaseService::new();
        let request = || CreateBoxRequest {
            box_number: "b-7".to_string(),
            holder_name: "Holder".to_string(),
            holder_phone: "9000000003".to_string(),
            location: None,
            volunteer_id: None,
            period: None,
        };
        db.create_box(request()).unwrap();
        assert!(matches!(db.create_box(request()), Err(AppError::Conflict(_))));
    }
}
