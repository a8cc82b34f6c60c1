//! 用户档案仓储

mod memory_repo;
mod profile_repo;
mod traits;

pub use memory_repo::MemoryProfileRepository;
pub use profile_repo::PgProfileRepository;
pub use traits::ProfileRepository;

#[cfg(test)]
pub use traits::MockProfileRepository;
