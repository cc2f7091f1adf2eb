pub mod donation;
pub mod person;
pub mod reservation;

pub use donation::{Availability, Donation, DonationDetails, Food};
pub use person::{Person, PersonSummary, Role};
pub use reservation::{
    CollectionStatus, Reservation, ReservationDetails, ReservationItem, ReservationItemDetails,
};
