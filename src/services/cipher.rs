//! 存档 blob 加密层
//!
//! AES（密钥长度由预共享密钥决定：16/24/32 字节）+ ECB + PKCS7，密文以标准 base64 存储。
//! ECB 没有逐块随机化，相同明文块得到相同密文块；为了与已有存档逐位兼容而保留。

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;
use zeroize::Zeroize;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("无效的密钥长度: {0} 字节（需要 16、24 或 32 字节）")]
    InvalidKeyLength(usize),

    #[error("base64 解码失败: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("解密失败：密文长度或填充无效（密钥错误或数据损坏）")]
    Padding,

    #[error("明文不是有效的 UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

enum AesKey {
    Aes128([u8; 16]),
    Aes192([u8; 24]),
    Aes256([u8; 32]),
}

impl Drop for AesKey {
    fn drop(&mut self) {
        match self {
            AesKey::Aes128(k) => k.zeroize(),
            AesKey::Aes192(k) => k.zeroize(),
            AesKey::Aes256(k) => k.zeroize(),
        }
    }
}

/// 对称 blob 加解密器
pub struct BlobCipher {
    key: AesKey,
}

impl BlobCipher {
    /// 以预共享密钥的 UTF-8 字节作为 AES 密钥
    pub fn new(secret: &str) -> Result<Self, CipherError> {
        Self::from_key_bytes(secret.as_bytes())
    }

    /// 从原始密钥字节构建
    pub fn from_key_bytes(bytes: &[u8]) -> Result<Self, CipherError> {
        let key = match bytes.len() {
            16 => AesKey::Aes128(copy_key(bytes)),
            24 => AesKey::Aes192(copy_key(bytes)),
            32 => AesKey::Aes256(copy_key(bytes)),
            n => return Err(CipherError::InvalidKeyLength(n)),
        };
        Ok(Self { key })
    }

    /// AES 密钥位数
    pub fn key_bits(&self) -> usize {
        match self.key {
            AesKey::Aes128(_) => 128,
            AesKey::Aes192(_) => 192,
            AesKey::Aes256(_) => 256,
        }
    }

    /// 加密明文；空输入返回空串
    pub fn encrypt(&self, plaintext: &str) -> String {
        if plaintext.is_empty() {
            return String::new();
        }
        STANDARD.encode(self.encrypt_bytes(plaintext.as_bytes()))
    }

    /// 解密密文；空输入返回空串，任何失败都视为空明文（fail-open）
    pub fn decrypt(&self, ciphertext: &str) -> String {
        match self.try_decrypt(ciphertext) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "存档解密失败，按空数据处理");
                String::new()
            }
        }
    }

    /// 解密密文，失败时返回具体错误（供需要感知损坏的调用方使用）
    pub fn try_decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        if ciphertext.is_empty() {
            return Ok(String::new());
        }
        let raw = STANDARD.decode(ciphertext.trim())?;
        let plain = self.decrypt_bytes(&raw)?;
        Ok(String::from_utf8(plain)?)
    }

    fn encrypt_bytes(&self, data: &[u8]) -> Vec<u8> {
        match &self.key {
            AesKey::Aes128(k) => {
                ecb::Encryptor::<Aes128>::new(&(*k).into()).encrypt_padded_vec_mut::<Pkcs7>(data)
            }
            AesKey::Aes192(k) => {
                ecb::Encryptor::<Aes192>::new(&(*k).into()).encrypt_padded_vec_mut::<Pkcs7>(data)
            }
            AesKey::Aes256(k) => {
                ecb::Encryptor::<Aes256>::new(&(*k).into()).encrypt_padded_vec_mut::<Pkcs7>(data)
            }
        }
    }

    fn decrypt_bytes(&self, data: &[u8]) -> Result<Vec<u8>, CipherError> {
        let result = match &self.key {
            AesKey::Aes128(k) => {
                ecb::Decryptor::<Aes128>::new(&(*k).into()).decrypt_padded_vec_mut::<Pkcs7>(data)
            }
            AesKey::Aes192(k) => {
                ecb::Decryptor::<Aes192>::new(&(*k).into()).decrypt_padded_vec_mut::<Pkcs7>(data)
            }
            AesKey::Aes256(k) => {
                ecb::Decryptor::<Aes256>::new(&(*k).into()).decrypt_padded_vec_mut::<Pkcs7>(data)
            }
        };
        result.map_err(|_| CipherError::Padding)
    }
}

impl std::fmt::Debug for BlobCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobCipher")
            .field("key_bits", &self.key_bits())
            .finish_non_exhaustive()
    }
}

fn copy_key<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut key = [0u8; N];
    key.copy_from_slice(bytes);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef";

    #[test]
    fn test_empty_in_empty_out() {
        let cipher = BlobCipher::new(SECRET).unwrap();
        assert_eq!(cipher.encrypt(""), "");
        assert_eq!(cipher.decrypt(""), "");
        assert_eq!(cipher.try_decrypt("").unwrap(), "");
    }

    #[test]
    fn test_roundtrip_each_key_size() {
        for secret in [
            "0123456789abcdef",
            "0123456789abcdef01234567",
            "0123456789abcdef0123456789abcdef",
        ] {
            let cipher = BlobCipher::new(secret).unwrap();
            let blob = "score:42\nlevel:7";
            let encrypted = cipher.encrypt(blob);
            assert_ne!(encrypted, blob);
            assert_eq!(cipher.decrypt(&encrypted), blob);
        }
    }

    #[test]
    fn test_key_bits() {
        assert_eq!(BlobCipher::new(SECRET).unwrap().key_bits(), 128);
        assert_eq!(
            BlobCipher::new("0123456789abcdef0123456789abcdef")
                .unwrap()
                .key_bits(),
            256
        );
    }

    #[test]
    fn test_rejects_invalid_key_length() {
        let err = BlobCipher::new("short").unwrap_err();
        assert!(matches!(err, CipherError::InvalidKeyLength(5)));
        assert!(err.to_string().contains("无效的密钥长度"));
    }

    #[test]
    fn test_known_answer_aes128_ecb() {
        // FIPS-197 附录 C.1
        let key = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let plain = hex::decode("00112233445566778899aabbccddeeff").unwrap();
        let cipher = BlobCipher::from_key_bytes(&key).unwrap();

        let out = cipher.encrypt_bytes(&plain);
        // 16 字节明文在 PKCS7 下追加一整块填充
        assert_eq!(out.len(), 32);
        assert_eq!(hex::encode(&out[..16]), "69c4e0d86a7b0430d8cdb78070b4c55a");
        assert_eq!(cipher.decrypt_bytes(&out).unwrap(), plain);
    }

    #[test]
    fn test_identical_blocks_identical_ciphertext() {
        let cipher = BlobCipher::new(SECRET).unwrap();
        let out = cipher.encrypt_bytes(&[b'A'; 32]);
        assert_eq!(out[..16], out[16..32]);
    }

    #[test]
    fn test_ciphertext_is_deterministic_base64() {
        let cipher = BlobCipher::new(SECRET).unwrap();
        let a = cipher.encrypt("hello");
        let b = cipher.encrypt("hello");
        assert_eq!(a, b);
        // 一个块 = 16 字节 = 24 个 base64 字符（含填充）
        assert_eq!(a.len(), 24);
        assert!(a.ends_with("=="));
    }

    #[test]
    fn test_bad_base64_fails_open() {
        let cipher = BlobCipher::new(SECRET).unwrap();
        assert_eq!(cipher.decrypt("this is *not* base64!"), "");
        assert!(matches!(
            cipher.try_decrypt("this is *not* base64!"),
            Err(CipherError::Base64(_))
        ));
    }

    #[test]
    fn test_wrong_key_fails_open() {
        let writer = BlobCipher::new(SECRET).unwrap();
        let reader = BlobCipher::new("fedcba9876543210").unwrap();
        let encrypted = writer.encrypt("score:42\nlevel:7\nname:alice");

        assert_eq!(reader.decrypt(&encrypted), "");
        assert!(reader.try_decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_truncated_ciphertext_fails_open() {
        let cipher = BlobCipher::new(SECRET).unwrap();
        // 10 字节，不是块长度的整数倍
        let truncated = STANDARD.encode([7u8; 10]);
        assert_eq!(cipher.decrypt(&truncated), "");
        assert!(matches!(
            cipher.try_decrypt(&truncated),
            Err(CipherError::Padding)
        ));
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let cipher = BlobCipher::new(SECRET).unwrap();
        let debug = format!("{:?}", cipher);
        assert!(!debug.contains(SECRET));
        assert!(debug.contains("128"));
    }
}
