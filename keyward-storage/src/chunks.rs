//! Chunked encryption for large payloads.
//!
//! Every chunk is sealed on its own with a fresh nonce and carries the
//! SHA-256 of its plaintext, so chunks can be uploaded, fetched and verified
//! independently. There is no cross-chunk state.

use crate::error::{StorageError, StorageResult};
use crate::file::{FileEncryptor, inaccessible_on_contract_violation};
use keyward_crypto::payload::b64;
use keyward_crypto::{EncryptedPayload, sha256_hex};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A plaintext slice of a file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChunk {
    pub index: u32,
    pub offset: u64,
    pub size: u64,
    #[serde(default, with = "b64::option", skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
    /// SHA-256 hex of `data`.
    pub checksum: String,
}

/// One independently encrypted chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedFileChunk {
    pub index: u32,
    pub offset: u64,
    pub original_size: u64,
    pub encrypted_size: u64,
    #[serde(with = "b64")]
    pub encrypted_data: Vec<u8>,
    #[serde(with = "b64")]
    pub iv: Vec<u8>,
    #[serde(default, with = "b64::option", skip_serializing_if = "Option::is_none")]
    pub salt: Option<Vec<u8>>,
    #[serde(with = "b64")]
    pub tag: Vec<u8>,
    pub original_checksum: String,
    pub key_id: String,
}

/// Splits `data` into chunks of at most `chunk_size` bytes.
///
/// Empty input yields no chunks.
pub fn split_into_chunks(data: &[u8], chunk_size: usize) -> StorageResult<Vec<FileChunk>> {
    if chunk_size == 0 {
        return Err(StorageError::Precondition("chunk size must be positive".into()));
    }
    data.chunks(chunk_size)
        .enumerate()
        .map(|(i, slice)| {
            let index = u32::try_from(i)
                .map_err(|_| StorageError::Precondition("too many chunks".into()))?;
            Ok(FileChunk {
                index,
                offset: (i * chunk_size) as u64,
                size: slice.len() as u64,
                data: Some(slice.to_vec()),
                checksum: sha256_hex(slice),
            })
        })
        .collect()
}

/// Reassembles chunks in index order, checking contiguity and checksums.
pub fn join_chunks(chunks: &[FileChunk]) -> StorageResult<Vec<u8>> {
    let mut ordered: Vec<&FileChunk> = chunks.iter().collect();
    ordered.sort_by_key(|c| c.index);

    let mut out = Vec::with_capacity(chunks.iter().map(|c| c.size as usize).sum());
    for chunk in ordered {
        let data = chunk.data.as_deref().ok_or_else(|| {
            StorageError::Precondition(format!("chunk {} has no data", chunk.index))
        })?;
        if chunk.offset != out.len() as u64 {
            return Err(StorageError::Precondition(format!(
                "chunk {} starts at {} but {} bytes precede it",
                chunk.index,
                chunk.offset,
                out.len()
            )));
        }
        if data.len() as u64 != chunk.size || sha256_hex(data) != chunk.checksum {
            return Err(StorageError::Precondition(format!(
                "chunk {} does not match its size/checksum",
                chunk.index
            )));
        }
        out.extend_from_slice(data);
    }
    Ok(out)
}

impl FileEncryptor {
    /// Splits `data` using the configured chunk size.
    pub fn split_into_chunks(&self, data: &[u8]) -> StorageResult<Vec<FileChunk>> {
        split_into_chunks(data, self.config.chunk_size)
    }

    /// Encrypts each chunk under the provider's key.
    ///
    /// Every chunk must carry data matching its `size` and `checksum`;
    /// otherwise nothing is encrypted and a precondition error is returned.
    pub fn encrypt_file_chunks(
        &self,
        chunks: &[FileChunk],
        provider: &str,
    ) -> StorageResult<Vec<EncryptedFileChunk>> {
        for chunk in chunks {
            let data = chunk.data.as_deref().ok_or_else(|| {
                StorageError::Precondition(format!("chunk {} has no data", chunk.index))
            })?;
            if data.len() as u64 != chunk.size || sha256_hex(data) != chunk.checksum {
                return Err(StorageError::Precondition(format!(
                    "chunk {} does not match its size/checksum",
                    chunk.index
                )));
            }
        }
        let key_id = self.create_cloud_provider_key(provider)?;

        let mut out = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let data = chunk.data.as_deref().unwrap_or_default();
            let payload = self
                .service
                .encrypt_bytes(data, &key_id)?
                .ok_or_else(|| StorageError::MissingKey(key_id.clone()))?;
            out.push(EncryptedFileChunk {
                index: chunk.index,
                offset: chunk.offset,
                original_size: chunk.size,
                encrypted_size: payload.ciphertext.len() as u64,
                encrypted_data: payload.ciphertext,
                iv: payload.iv,
                salt: None,
                tag: payload.tag,
                original_checksum: chunk.checksum.clone(),
                key_id: key_id.clone(),
            });
        }
        debug!(provider, chunks = out.len(), "encrypted file chunks");
        Ok(out)
    }

    /// Decrypts and re-validates every chunk.
    ///
    /// Returns `Ok(None)` for the whole set if any chunk is inaccessible,
    /// malformed or fails its checksum.
    pub fn decrypt_file_chunks(
        &self,
        chunks: &[EncryptedFileChunk],
    ) -> StorageResult<Option<Vec<FileChunk>>> {
        let mut out = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let payload = EncryptedPayload {
                ciphertext: chunk.encrypted_data.clone(),
                iv: chunk.iv.clone(),
                tag: chunk.tag.clone(),
                key_id: Some(chunk.key_id.clone()),
                algorithm: Default::default(),
            };
            let Some(data) = inaccessible_on_contract_violation(self.service.decrypt_bytes(&payload))?
            else {
                warn!(index = chunk.index, "chunk is inaccessible");
                return Ok(None);
            };
            if data.len() as u64 != chunk.original_size || sha256_hex(&data) != chunk.original_checksum
            {
                warn!(index = chunk.index, "chunk checksum mismatch");
                return Ok(None);
            }
            out.push(FileChunk {
                index: chunk.index,
                offset: chunk.offset,
                size: chunk.original_size,
                checksum: chunk.original_checksum.clone(),
                data: Some(data),
            });
        }
        Ok(Some(out))
    }
}
