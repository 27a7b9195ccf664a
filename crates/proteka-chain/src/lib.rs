//! proteka-chain — provenance periphery: content identifier validation,
//! IPFS pinning via Pinata, and single-shot chain recording through an
//! external wallet agent.

pub mod cid;
pub mod ipfs;
pub mod recorder;

pub use cid::validate_cid;
pub use ipfs::IpfsClient;
pub use recorder::{ChainReceipt, ChainRecorder};
