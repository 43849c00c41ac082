pub mod access_service;
pub use access_service::{AccessGrant, AccessService, Denied, DenyReason};

pub mod access_service_impl;
pub use access_service_impl::RepositoryAccessService;

pub mod hash;

pub mod kick;
pub use kick::{KickError, KickService};

pub mod release;
pub use release::{ReleaseError, ReleaseService, SemVer};

pub mod subscription;
pub use subscription::{ClientFamily, Subscription, SubscriptionError, SubscriptionService};
