//! Passphrase hashing with Argon2id.
//!
//! Hashing and verification cost tens of milliseconds of CPU and run on a
//! blocking thread so they never stall the async runtime. Verification is
//! a single-shot, non-cancellable compute.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use tokio::task;

use crate::error::AppError;

const MEMORY_KIB: u32 = 65536;
const PARALLELISM: u32 = 4;
const OUTPUT_LEN: usize = 32;

fn argon2_with_cost(time_cost: u32) -> Result<Argon2<'static>, AppError> {
    let params = ParamsBuilder::new()
        .m_cost(MEMORY_KIB)
        .t_cost(time_cost.max(1))
        .p_cost(PARALLELISM)
        .output_len(OUTPUT_LEN)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build Argon2 params: {e}")))?;
    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a passphrase into a PHC string suitable for storage.
pub async fn hash_passphrase(passphrase: &str, time_cost: u32) -> Result<String, AppError> {
    let passphrase = passphrase.to_string();

    task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = argon2_with_cost(time_cost)?;

        let hash = argon2
            .hash_password(passphrase.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash passphrase: {e}")))?
            .to_string();

        Ok(hash)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Passphrase hashing task failed: {e}")))?
}

/// Verify a passphrase against a stored PHC hash.
///
/// The PHC string carries its own parameters, so verification works across
/// cost changes. Comparison inside argon2 is constant time.
pub async fn verify_passphrase(passphrase: &str, hash: &str) -> Result<bool, AppError> {
    let passphrase = passphrase.to_string();
    let hash = hash.to_string();

    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&hash)
            .map_err(|e| AppError::Internal(format!("Invalid passphrase hash format: {e}")))?;

        match Argon2::default().verify_password(passphrase.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::Internal(format!(
                "Passphrase verification failed: {e}"
            ))),
        }
    })
    .await
    .map_err(|e| AppError::Internal(format!("Passphrase verification task failed: {e}")))?
}
