//! PDF Standard security handler (RC4, revisions 2 and 3)
//!
//! Produces the `/Encrypt` dictionary and encrypts every string and stream
//! of a finished document. Opening requires the user password; the owner
//! password lifts the permission restrictions.

use lopdf::{dictionary, Document, Object, ObjectId, StringFormat};
use std::ops::BitOr;

/// Padding string from the Standard security handler definition
pub const PAD_BYTES: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// RC4 keystream XOR; the same call encrypts and decrypts
pub fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s: [u8; 256] = std::array::from_fn(|i| i as u8);
    let mut j = 0usize;
    for i in 0..256 {
        j = (j + s[i] as usize + key[i % key.len()] as usize) & 0xFF;
        s.swap(i, j);
    }

    let mut out = Vec::with_capacity(data.len());
    let (mut i, mut j) = (0usize, 0usize);
    for &byte in data {
        i = (i + 1) & 0xFF;
        j = (j + s[i] as usize) & 0xFF;
        s.swap(i, j);
        out.push(byte ^ s[(s[i] as usize + s[j] as usize) & 0xFF]);
    }
    out
}

/// Key length and handler revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionStrength {
    /// 40-bit key, revision 2
    Rc4_40,
    /// 128-bit key, revision 3
    #[default]
    Rc4_128,
}

impl EncryptionStrength {
    fn key_len(self) -> usize {
        match self {
            Self::Rc4_40 => 5,
            Self::Rc4_128 => 16,
        }
    }

    fn revision(self) -> i64 {
        match self {
            Self::Rc4_40 => 2,
            Self::Rc4_128 => 3,
        }
    }

    fn version(self) -> i64 {
        match self {
            Self::Rc4_40 => 1,
            Self::Rc4_128 => 2,
        }
    }
}

/// User access permission bits (`/P`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Permissions(u32);

impl Permissions {
    pub const NONE: Permissions = Permissions(0);
    pub const PRINT: Permissions = Permissions(1 << 2);
    pub const MODIFY: Permissions = Permissions(1 << 3);
    pub const COPY: Permissions = Permissions(1 << 4);

    pub fn contains(self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }

    /// Signed `/P` value with the reserved bits set for the revision
    pub fn p_value(self, strength: EncryptionStrength) -> i32 {
        let reserved: u32 = match strength {
            EncryptionStrength::Rc4_40 => 0xFFFF_FFC0,
            EncryptionStrength::Rc4_128 => 0xFFFF_F0C0,
        };
        (reserved | self.0) as i32
    }
}

impl BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 | rhs.0)
    }
}

/// Passwords and permissions to protect a document with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protection {
    pub user_password: Vec<u8>,
    pub owner_password: Vec<u8>,
    pub permissions: Permissions,
    pub strength: EncryptionStrength,
}

impl Protection {
    pub fn new(user: impl AsRef<[u8]>, owner: impl AsRef<[u8]>, permissions: Permissions) -> Self {
        Self {
            user_password: user.as_ref().to_vec(),
            owner_password: owner.as_ref().to_vec(),
            permissions,
            strength: EncryptionStrength::default(),
        }
    }

    pub fn with_strength(mut self, strength: EncryptionStrength) -> Self {
        self.strength = strength;
        self
    }
}

fn pad_password(password: &[u8]) -> [u8; 32] {
    let len = password.len().min(32);
    let mut padded = [0u8; 32];
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PAD_BYTES[..32 - len]);
    padded
}

fn xor_key(key: &[u8], round: u8) -> Vec<u8> {
    key.iter().map(|b| b ^ round).collect()
}

/// Encryption state derived for one document
#[derive(Debug, Clone)]
pub struct SecurityHandler {
    strength: EncryptionStrength,
    permissions: i32,
    file_id: Vec<u8>,
    owner_entry: Vec<u8>,
    user_entry: Vec<u8>,
    key: Vec<u8>,
}

impl SecurityHandler {
    /// Derive `/O`, `/U` and the file key; `file_id` is the first `/ID` element
    pub fn new(protection: &Protection, file_id: &[u8]) -> Self {
        let strength = protection.strength;
        let permissions = protection.permissions.p_value(strength);
        let owner_source = if protection.owner_password.is_empty() {
            &protection.user_password
        } else {
            &protection.owner_password
        };
        let owner_entry = Self::owner_entry(strength, owner_source, &protection.user_password);

        let mut handler = Self {
            strength,
            permissions,
            file_id: file_id.to_vec(),
            owner_entry,
            user_entry: Vec::new(),
            key: Vec::new(),
        };
        handler.key = handler.file_key(&protection.user_password);
        handler.user_entry = handler.user_entry_for(&handler.key);
        handler
    }

    /// Key that wraps the padded user password into `/O`
    fn owner_rc4_key(strength: EncryptionStrength, owner: &[u8]) -> Vec<u8> {
        let n = strength.key_len();
        let mut digest = md5::compute(pad_password(owner)).0;
        if strength == EncryptionStrength::Rc4_128 {
            for _ in 0..50 {
                digest = md5::compute(&digest[..n]).0;
            }
        }
        digest[..n].to_vec()
    }

    fn owner_entry(strength: EncryptionStrength, owner: &[u8], user: &[u8]) -> Vec<u8> {
        let key = Self::owner_rc4_key(strength, owner);
        let mut entry = rc4(&key, &pad_password(user));
        if strength == EncryptionStrength::Rc4_128 {
            for round in 1..=19u8 {
                entry = rc4(&xor_key(&key, round), &entry);
            }
        }
        entry
    }

    fn file_key(&self, user: &[u8]) -> Vec<u8> {
        let n = self.strength.key_len();
        let mut ctx = md5::Context::new();
        ctx.consume(pad_password(user));
        ctx.consume(&self.owner_entry);
        ctx.consume((self.permissions as u32).to_le_bytes());
        ctx.consume(&self.file_id);
        let mut digest = ctx.compute().0;
        if self.strength == EncryptionStrength::Rc4_128 {
            for _ in 0..50 {
                digest = md5::compute(&digest[..n]).0;
            }
        }
        digest[..n].to_vec()
    }

    fn user_entry_for(&self, key: &[u8]) -> Vec<u8> {
        match self.strength {
            EncryptionStrength::Rc4_40 => rc4(key, &PAD_BYTES),
            EncryptionStrength::Rc4_128 => {
                let mut ctx = md5::Context::new();
                ctx.consume(PAD_BYTES);
                ctx.consume(&self.file_id);
                let mut entry = rc4(key, &ctx.compute().0);
                for round in 1..=19u8 {
                    entry = rc4(&xor_key(key, round), &entry);
                }
                entry.extend_from_slice(&PAD_BYTES[..16]);
                entry
            }
        }
    }

    /// True when `password` opens the document as a user
    pub fn authenticate_user(&self, password: &[u8]) -> bool {
        let candidate = self.user_entry_for(&self.file_key(password));
        match self.strength {
            EncryptionStrength::Rc4_40 => candidate == self.user_entry,
            EncryptionStrength::Rc4_128 => candidate[..16] == self.user_entry[..16],
        }
    }

    /// True when `password` is the owner password
    pub fn authenticate_owner(&self, password: &[u8]) -> bool {
        let key = Self::owner_rc4_key(self.strength, password);
        let mut user = self.owner_entry.clone();
        match self.strength {
            EncryptionStrength::Rc4_40 => user = rc4(&key, &user),
            EncryptionStrength::Rc4_128 => {
                for round in (0..=19u8).rev() {
                    user = rc4(&xor_key(&key, round), &user);
                }
            }
        }
        self.authenticate_user(&user)
    }

    /// Per-object key: file key salted with object number and generation
    pub fn object_key(&self, id: ObjectId) -> Vec<u8> {
        let mut ctx = md5::Context::new();
        ctx.consume(&self.key);
        ctx.consume(&id.0.to_le_bytes()[..3]);
        ctx.consume(&id.1.to_le_bytes()[..2]);
        let len = (self.key.len() + 5).min(16);
        ctx.compute().0[..len].to_vec()
    }

    /// Encrypt every string and stream reachable inside `object`
    pub fn encrypt_object(&self, id: ObjectId, object: &mut Object) {
        let key = self.object_key(id);
        encrypt_in_place(&key, object);
    }

    /// Encrypt all objects of `doc` and register the `/Encrypt` dictionary
    pub fn apply(&self, doc: &mut Document) {
        for (&id, object) in doc.objects.iter_mut() {
            self.encrypt_object(id, object);
        }
        let encrypt_id = doc.add_object(self.encrypt_dictionary());
        doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
    }

    pub fn encrypt_dictionary(&self) -> lopdf::Dictionary {
        dictionary! {
            "Filter" => "Standard",
            "V" => Object::Integer(self.strength.version()),
            "R" => Object::Integer(self.strength.revision()),
            "Length" => Object::Integer(self.strength.key_len() as i64 * 8),
            "O" => Object::String(self.owner_entry.clone(), StringFormat::Hexadecimal),
            "U" => Object::String(self.user_entry.clone(), StringFormat::Hexadecimal),
            "P" => Object::Integer(self.permissions as i64),
        }
    }
}

fn encrypt_in_place(key: &[u8], object: &mut Object) {
    match object {
        Object::String(bytes, _) => *bytes = rc4(key, bytes),
        Object::Array(items) => items.iter_mut().for_each(|item| encrypt_in_place(key, item)),
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                encrypt_in_place(key, value);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                encrypt_in_place(key, value);
            }
            let encrypted = rc4(key, &stream.content);
            stream.set_content(encrypted);
        }
        _ => {}
    }
}
