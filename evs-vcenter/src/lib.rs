//! vCenter side of the VCF to EVS toolkit.
//!
//! [`VCenterClient`] owns one vCenter session and exposes the VM, snapshot
//! and export operations a migration needs. It talks to vCenter through the
//! [`VSphereApi`] trait, implemented over the vSphere Automation REST API by
//! [`VsphereRestApi`].

pub mod api;
pub mod client;
pub mod error;
pub mod ovf;
pub mod rest;
pub mod snapshot;
pub mod types;

#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;

pub use api::VSphereApi;
pub use client::{VCenterClient, VCenterSettings};
pub use error::{VCenterError, VCenterErrorKind, VCenterResult};
pub use rest::{RestSettings, VsphereRestApi};
pub use types::{
    SnapshotId, SnapshotNode, SnapshotSpec, TaskHandle, TaskInfo, TaskState, VmInfo, VmSummary,
};

#[cfg(any(test, feature = "test-helpers"))]
pub use mock::{MockVSphere, MockVSphereCall};
