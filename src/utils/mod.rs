use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// 随机令牌的字节数，十六进制编码后为64个字符
pub const TOKEN_BYTES: usize = 32;

/// 计算令牌的 SHA-256 摘要（小写十六进制）
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// 常量时间比较两个摘要，耗时与首个不同字节的位置无关
pub fn digests_equal(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// 生成随机令牌
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// 生成随机系列标识
pub fn generate_series() -> String {
    generate_token()
}
