use crate::{HASH_SIZE, Hash};
use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512_256};

pub trait HasherBase {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self;
}

pub trait Hasher: HasherBase + Clone + Default {
    fn finalize(self) -> Hash;

    fn hash<A: AsRef<[u8]>>(data: A) -> Hash {
        let mut hasher = Self::default();
        hasher.update(data);
        hasher.finalize()
    }
}

/// Streaming sha256d, the digest behind transaction ids and signature hashes.
#[derive(Clone, Default)]
pub struct DoubleSha256(Sha256);

impl HasherBase for DoubleSha256 {
    #[inline(always)]
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        Digest::update(&mut self.0, data.as_ref());
        self
    }
}

impl Hasher for DoubleSha256 {
    #[inline]
    fn finalize(self) -> Hash {
        let first = self.0.finalize();
        Hash::from_bytes(Sha256::digest(first).into())
    }
}

#[derive(Clone, Default)]
pub struct Sha256Hasher(Sha256);

impl HasherBase for Sha256Hasher {
    #[inline(always)]
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        Digest::update(&mut self.0, data.as_ref());
        self
    }
}

impl Hasher for Sha256Hasher {
    #[inline]
    fn finalize(self) -> Hash {
        Hash::from_bytes(self.0.finalize().into())
    }
}

#[inline]
pub fn sha256(data: &[u8]) -> [u8; HASH_SIZE] {
    Sha256::digest(data).into()
}

#[inline]
pub fn sha256d(data: &[u8]) -> [u8; HASH_SIZE] {
    Sha256::digest(Sha256::digest(data)).into()
}

#[inline]
pub fn sha1(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

#[inline]
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(data).into()
}

/// ripemd160(sha256(data))
#[inline]
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

#[inline]
pub fn sha512_256(data: &[u8]) -> [u8; HASH_SIZE] {
    Sha512_256::digest(data).into()
}

/// sha512/256 applied twice.
#[inline]
pub fn hash512_256(data: &[u8]) -> [u8; HASH_SIZE] {
    Sha512_256::digest(Sha512_256::digest(data)).into()
}
