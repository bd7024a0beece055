//! Module `crypto` implements the log-structured backend's per-page
//! encryption hook: spec.md §4.2's ESSIV scheme over AES-256-CBC.
//!
//! Each 4096-byte page is encrypted independently. The IV for page `p`
//! is derived by AES-encrypting the page number (big-endian `u64`,
//! zero-padded to 16 bytes) with `K_iv = SHA256(key)` — the standard
//! ESSIV construction, so that identical plaintext pages at different
//! offsets still produce different ciphertext without needing a stored
//! per-page IV.
//!
//! Grounded on `examples/original_source/CBForest/Encryption/
//! filemgr_ops_encrypted.cc`, which wraps the backend's raw file ops
//! with CommonCrypto AES-CBC; we use the RustCrypto `aes`/`cbc`/`sha2`
//! crates for the equivalent on stable Rust, and `sys::PAGE_SIZE`-style
//! path-keyed registry (`registerKey`/`get(path)` in the original) is
//! `KeyRegistry` below.

use std::collections::HashMap;
use std::sync::RwLock;

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use aes::Aes256;
use lazy_static::lazy_static;
use sha2::{Digest, Sha256};

use crate::error::Error;
use crate::Result;

pub const PAGE_SIZE: usize = 4096;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Per-file page cipher: AES-256-CBC with an ESSIV-derived IV.
#[derive(Clone)]
pub struct PageCipher {
    key: [u8; 32],
    iv_key: Aes256,
}

impl PageCipher {
    pub fn new(key: [u8; 32]) -> PageCipher {
        let iv_key_bytes: [u8; 32] = Sha256::digest(key).into();
        let iv_key = Aes256::new_from_slice(&iv_key_bytes).expect("sha256 digest is 32 bytes");
        PageCipher { key, iv_key }
    }

    fn derive_iv(&self, page: u64) -> [u8; 16] {
        let mut block = [0u8; 16];
        block[8..16].copy_from_slice(&page.to_be_bytes());
        let mut generic: aes::cipher::generic_array::GenericArray<u8, _> = block.into();
        self.iv_key.encrypt_block(&mut generic);
        generic.into()
    }

    /// Encrypt one whole page (must be exactly [`PAGE_SIZE`] bytes).
    pub fn encrypt_page(&self, page_index: u64, plaintext: &[u8]) -> Result<Vec<u8>> {
        if plaintext.len() != PAGE_SIZE {
            return Err(Error::InvalidParameter(format!(
                "page must be {} bytes, got {}",
                PAGE_SIZE,
                plaintext.len()
            )));
        }
        let iv = self.derive_iv(page_index);
        let enc = Aes256CbcEnc::new(&self.key.into(), &iv.into());
        let mut buf = plaintext.to_vec();
        // PAGE_SIZE is a multiple of the AES block size, so CBC without
        // padding fits exactly and no length change occurs.
        let ct = enc
            .encrypt_padded_mut::<aes::cipher::block_padding::NoPadding>(&mut buf, plaintext.len())
            .map_err(|e| Error::UnexpectedError(format!("page encrypt failed: {}", e)))?;
        Ok(ct.to_vec())
    }

    /// Decrypt one whole page.
    pub fn decrypt_page(&self, page_index: u64, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() != PAGE_SIZE {
            return Err(Error::InvalidParameter(format!(
                "page must be {} bytes, got {}",
                PAGE_SIZE,
                ciphertext.len()
            )));
        }
        let iv = self.derive_iv(page_index);
        let dec = Aes256CbcDec::new(&self.key.into(), &iv.into());
        let mut buf = ciphertext.to_vec();
        let pt = dec
            .decrypt_padded_mut::<aes::cipher::block_padding::NoPadding>(&mut buf)
            .map_err(|_| Error::NotADatabaseFile)?;
        Ok(pt.to_vec())
    }
}

/// A process-wide `path -> key` registry so that auxiliary files created
/// by compaction (e.g. `<path>.0`, `<path>.1`) inherit the base file's
/// key purely by path lookup, without the caller having to re-supply it.
pub struct KeyRegistry;

lazy_static! {
    static ref REGISTRY: RwLock<HashMap<String, [u8; 32]>> = RwLock::new(HashMap::new());
}

impl KeyRegistry {
    pub fn register(path: &str, key: [u8; 32]) {
        REGISTRY.write().unwrap().insert(path.to_string(), key);
    }

    pub fn lookup(path: &str) -> Option<[u8; 32]> {
        REGISTRY.read().unwrap().get(path).copied()
    }

    pub fn forget(path: &str) {
        REGISTRY.write().unwrap().remove(path);
    }
}

#[cfg(test)]
mod crypto_test {
    use super::*;

    #[test]
    fn test_page_roundtrip() {
        let cipher = PageCipher::new([7u8; 32]);
        let mut page = vec![0u8; PAGE_SIZE];
        for (i, b) in page.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        let ct = cipher.encrypt_page(3, &page).unwrap();
        assert_ne!(ct, page);
        let pt = cipher.decrypt_page(3, &ct).unwrap();
        assert_eq!(pt, page);
    }

    #[test]
    fn test_different_pages_differ_for_same_plaintext() {
        let cipher = PageCipher::new([1u8; 32]);
        let page = vec![0xAB; PAGE_SIZE];
        let ct0 = cipher.encrypt_page(0, &page).unwrap();
        let ct1 = cipher.encrypt_page(1, &page).unwrap();
        assert_ne!(ct0, ct1);
    }

    #[test]
    fn test_wrong_key_fails_to_decrypt_cleanly() {
        // NoPadding means garbage bytes still "decrypt" to garbage rather
        // than erroring; callers must validate via a magic/checksum, as
        // the log backend does on its header page.
        let a = PageCipher::new([1u8; 32]);
        let b = PageCipher::new([2u8; 32]);
        let page = vec![0x42; PAGE_SIZE];
        let ct = a.encrypt_page(0, &page).unwrap();
        let pt = b.decrypt_page(0, &ct).unwrap();
        assert_ne!(pt, page);
    }

    #[test]
    fn test_rejects_non_page_sized_input() {
        let cipher = PageCipher::new([0u8; 32]);
        assert!(cipher.encrypt_page(0, &[0u8; 10]).is_err());
    }

    #[test]
    fn test_registry_path_lookup() {
        KeyRegistry::register("/tmp/test.db", [9u8; 32]);
        assert_eq!(KeyRegistry::lookup("/tmp/test.db"), Some([9u8; 32]));
        KeyRegistry::register("/tmp/test.db.0", KeyRegistry::lookup("/tmp/test.db").unwrap());
        assert_eq!(KeyRegistry::lookup("/tmp/test.db.0"), Some([9u8; 32]));
        KeyRegistry::forget("/tmp/test.db");
        KeyRegistry::forget("/tmp/test.db.0");
    }
}
