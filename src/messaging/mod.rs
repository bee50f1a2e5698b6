// Messaging - Change notifications leaving the transport without blocking

pub mod channels;
pub mod event;
