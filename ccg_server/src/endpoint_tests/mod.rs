mod cart;
mod helpers;
mod mocks;
mod orders;
mod payments;
mod webhooks;
