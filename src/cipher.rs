//! パスフレーズによる対称暗号化（セッション値の保護用）
//!
//! AES-256-CBC / PKCS7。暗号文の形式:
//!   base64( IV (16 bytes) | ciphertext )
//!
//! 改ざん検知（MAC）は行わない。パディングが偶然正しければ、
//! 壊れた暗号文でもエラーにならず不正な平文が返る。

use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{rngs::OsRng, RngCore};
use crate::error::Error;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// 鍵長（AES-256）
pub const KEY_SIZE: usize = 32;

/// IV長（AESのブロックサイズ）
pub const IV_SIZE: usize = 16;

/// パスフレーズを32バイトの鍵に変換（短ければゼロ埋め、長ければ切り詰め）
///
/// 先頭32バイトが同じパスフレーズは同じ鍵になる。
fn derive_key(key: &str) -> [u8; KEY_SIZE] {
    let bytes = key.as_bytes();
    let mut out = [0u8; KEY_SIZE];
    let len = bytes.len().min(KEY_SIZE);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

/// 平文を暗号化してbase64文字列を返す
pub fn encrypt(plain_text: &str, key: &str) -> Result<String, Error> {
    if plain_text.trim().is_empty() {
        return Err(Error::InvalidArgument("plain_text must not be empty".to_string()));
    }
    if key.is_empty() {
        return Err(Error::InvalidArgument("key must not be empty".to_string()));
    }

    let key_bytes = derive_key(key);
    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);

    let encryptor = Aes256CbcEnc::new_from_slices(&key_bytes, &iv)
        .map_err(|e| Error::Crypto(e.to_string()))?;
    let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plain_text.as_bytes());

    let mut out = Vec::with_capacity(IV_SIZE + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(base64::encode(out))
}

/// base64文字列を復号して平文を返す
pub fn decrypt(cipher_text: &str, key: &str) -> Result<String, Error> {
    if cipher_text.trim().is_empty() {
        return Err(Error::InvalidArgument("cipher_text must not be empty".to_string()));
    }
    if key.is_empty() {
        return Err(Error::InvalidArgument("key must not be empty".to_string()));
    }

    let key_bytes = derive_key(key);
    let data = base64::decode(cipher_text.trim())?;
    if data.len() < IV_SIZE {
        return Err(Error::Crypto(format!(
            "payload is shorter than IV ({} bytes)",
            data.len()
        )));
    }
    let (iv, ciphertext) = data.split_at(IV_SIZE);

    let decryptor = Aes256CbcDec::new_from_slices(&key_bytes, iv)
        .map_err(|e| Error::Crypto(e.to_string()))?;
    let plain = decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| Error::Crypto("invalid padding or wrong key".to_string()))?;

    Ok(String::from_utf8_lossy(&plain).into_owned())
}
