use std::io::Read;
use std::path::Path;

use scfdeploy_protocol::Fingerprint;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::TransferError;

/// Fingerprints a packaged artifact by hashing its full contents.
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint, TransferError> {
    if !path.is_file() {
        return Err(TransferError::ArtifactMissing(path.display().to_string()));
    }
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    let mut total: u64 = 0;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    let digest = hex::encode(hasher.finalize());
    debug!(path = %path.display(), bytes = total, fingerprint = %digest, "fingerprinted artifact");
    Ok(Fingerprint::new(digest))
}
