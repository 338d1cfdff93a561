//! Canonical encodings: the hash-chained entry format and the pinned map
//! root serialization anchored into the log.

use crate::types::*;

// ——— Canonical encoding version ———

const ENC_V1: u8 = 1; // version tag for the entry encoding

// Public key tags inside the entry encoding.
const KEY_TAG_ED25519: u8 = 1;
const KEY_TAG_RSA3072: u8 = 2;
const KEY_TAG_ECDSA_P256: u8 = 3;

impl PublicKey {
    /// Tagged, length-prefixed encoding of one key.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let (tag, material): (u8, &[u8]) = match self {
            PublicKey::Ed25519(bytes) => (KEY_TAG_ED25519, bytes),
            PublicKey::Rsa3072Sha256(bytes) => (KEY_TAG_RSA3072, bytes),
            PublicKey::EcdsaP256(bytes) => (KEY_TAG_ECDSA_P256, bytes),
        };
        let mut out = Vec::with_capacity(1 + 4 + material.len());
        out.push(tag);
        encode_bytes(material, &mut out);
        out
    }

    fn decode(data: &mut &[u8]) -> Result<Self, EntryError> {
        let tag = read_u8(data)?;
        let material = read_vec(data)?;
        match tag {
            KEY_TAG_ED25519 => {
                if material.len() != ED25519_KEY_LEN {
                    return Err(EntryError::Eof);
                }
                let mut out = [0u8; ED25519_KEY_LEN];
                out.copy_from_slice(&material);
                Ok(PublicKey::Ed25519(out))
            }
            KEY_TAG_RSA3072 => Ok(PublicKey::Rsa3072Sha256(material)),
            KEY_TAG_ECDSA_P256 => Ok(PublicKey::EcdsaP256(material)),
            other => Err(EntryError::KeyTag(other)),
        }
    }
}

impl Entry {
    /// Canonical byte encoding. Authorized keys are a set: their encodings
    /// are sorted so the bytes do not depend on insertion order.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut keys: Vec<Vec<u8>> = self
            .authorized_keys
            .iter()
            .map(PublicKey::to_canonical_bytes)
            .collect();
        keys.sort();
        keys.dedup();

        let mut out = Vec::with_capacity(1 + 4 + self.commitment.len() + 4 + self.previous.len());
        out.push(ENC_V1);
        encode_bytes(&self.commitment, &mut out);
        encode_u32(keys.len() as u32, &mut out);
        for key in &keys {
            out.extend_from_slice(key);
        }
        encode_bytes(&self.previous, &mut out);
        out
    }

    pub fn from_canonical_bytes(mut data: &[u8]) -> Result<Self, EntryError> {
        let ver = read_u8(&mut data)?;
        if ver != ENC_V1 {
            return Err(EntryError::Version(ver));
        }
        let commitment = read_vec(&mut data)?;
        let count = read_u32(&mut data)? as usize;
        let mut authorized_keys = Vec::with_capacity(count);
        for _ in 0..count {
            authorized_keys.push(PublicKey::decode(&mut data)?);
        }
        let previous = read_vec(&mut data)?;
        if !data.is_empty() {
            return Err(EntryError::Trailing);
        }
        Ok(Entry { commitment, authorized_keys, previous })
    }
}

impl SignedMapRoot {
    /// The canonical serialization anchored into the log. Pinned to the JSON
    /// encoding of this struct in declaration order; it must stay stable
    /// across processes because the log deduplicates by its SHA-256.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

// ——— Encoding primitives ———

fn encode_u32(v: u32, out: &mut Vec<u8>) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    encode_u32(bytes.len() as u32, out);
    out.extend_from_slice(bytes);
}

fn read_u8(data: &mut &[u8]) -> Result<u8, EntryError> {
    if data.is_empty() {
        return Err(EntryError::Eof);
    }
    let v = data[0];
    *data = &data[1..];
    Ok(v)
}

fn read_u32(data: &mut &[u8]) -> Result<u32, EntryError> {
    if data.len() < 4 {
        return Err(EntryError::Eof);
    }
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[..4]);
    *data = &data[4..];
    Ok(u32::from_be_bytes(buf))
}

fn read_vec(data: &mut &[u8]) -> Result<Vec<u8>, EntryError> {
    let len = read_u32(data)? as usize;
    if data.len() < len {
        return Err(EntryError::Eof);
    }
    let v = data[..len].to_vec();
    *data = &data[len..];
    Ok(v)
}
