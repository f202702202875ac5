mod access;
mod dispatch;
mod helpers;
mod mocks;
mod queries;
mod socket;
