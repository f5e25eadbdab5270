use core::fmt;

use zeroize::Zeroize;

use crate::enums::ProtocolVersion;
use crate::suites::SupportedCipherSuite;

pub(crate) mod prf;

/// Length of a TLS master secret.
pub const MASTER_SECRET_LEN: usize = 48;

/// Length of the Finished `verify_data`.
pub const VERIFY_DATA_LEN: usize = 12;

/// The pair of hello randoms for one handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionRandoms {
    /// ClientHello.random
    pub client: [u8; 32],
    /// ServerHello.random
    pub server: [u8; 32],
}

/// Where the master secret comes from.
pub enum MasterSecretInput<'a> {
    /// A full handshake: the agreed pre-master secret.  `session_hash` is
    /// the transcript hash through ClientKeyExchange when the extended
    /// master secret (RFC 7627) was negotiated.
    PreMaster {
        pre_master: &'a [u8],
        session_hash: Option<&'a [u8]>,
    },
    /// A resumption: the master secret stored in the session.
    Master(&'a MasterSecret),
}

/// A 48-byte master secret, zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterSecret([u8; MASTER_SECRET_LEN]);

impl MasterSecret {
    /// Wrap raw master secret bytes.
    pub fn new(bytes: [u8; MASTER_SECRET_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy from a slice; `None` unless it is exactly 48 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let mut secret = [0u8; MASTER_SECRET_LEN];
        if bytes.len() != MASTER_SECRET_LEN {
            return None;
        }
        secret.copy_from_slice(bytes);
        Some(Self(secret))
    }

    /// The raw secret.
    pub fn as_bytes(&self) -> &[u8; MASTER_SECRET_LEN] {
        &self.0
    }
}

impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterSecret(..)")
    }
}

impl Drop for MasterSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Derives master secrets, record keys and Finished values.
///
/// Everything here is a pure function of its inputs.
pub struct KeyScheduler;

impl KeyScheduler {
    /// Produce the master secret and key block for `suite` at `version`.
    pub fn derive(
        input: MasterSecretInput<'_>,
        randoms: &ConnectionRandoms,
        suite: &'static SupportedCipherSuite,
        version: ProtocolVersion,
    ) -> SessionKeys {
        let mut master_secret = [0u8; MASTER_SECRET_LEN];
        match input {
            MasterSecretInput::PreMaster {
                pre_master,
                session_hash: Some(hash),
            } => prf_for(
                suite,
                version,
                &mut master_secret,
                pre_master,
                b"extended master secret",
                hash,
            ),
            MasterSecretInput::PreMaster {
                pre_master,
                session_hash: None,
            } => prf_for(
                suite,
                version,
                &mut master_secret,
                pre_master,
                b"master secret",
                &join_randoms(&randoms.client, &randoms.server),
            ),
            MasterSecretInput::Master(master) => master_secret.copy_from_slice(master.as_bytes()),
        }
        let master_secret = MasterSecret(master_secret);

        let mut key_block = vec![0u8; suite.key_block_len(version)];
        // NOTE: opposite order to the master secret seed.
        prf_for(
            suite,
            version,
            &mut key_block,
            master_secret.as_bytes(),
            b"key expansion",
            &join_randoms(&randoms.server, &randoms.client),
        );

        let mac_len = suite.mac_key_len();
        let key_len = suite.key_len();
        let iv_len = suite.fixed_iv_len(version);

        let (client_mac, rest) = key_block.split_at(mac_len);
        let (server_mac, rest) = rest.split_at(mac_len);
        let (client_key, rest) = rest.split_at(key_len);
        let (server_key, rest) = rest.split_at(key_len);
        let (client_iv, server_iv) = rest.split_at(iv_len);

        let keys = SessionKeys {
            master_secret,
            client: DirectionalKeys::new(suite, version, client_mac, client_key, client_iv),
            server: DirectionalKeys::new(suite, version, server_mac, server_key, server_iv),
        };
        key_block.zeroize();
        keys
    }

    /// The Finished `verify_data` for `label` over `handshake_hash`.
    pub fn verify_data(
        master_secret: &[u8],
        suite: &'static SupportedCipherSuite,
        version: ProtocolVersion,
        label: &[u8],
        handshake_hash: &[u8],
    ) -> [u8; VERIFY_DATA_LEN] {
        let mut out = [0u8; VERIFY_DATA_LEN];
        prf_for(suite, version, &mut out, master_secret, label, handshake_hash);
        out
    }
}

fn prf_for(
    suite: &'static SupportedCipherSuite,
    version: ProtocolVersion,
    out: &mut [u8],
    secret: &[u8],
    label: &[u8],
    seed: &[u8],
) {
    if version.uses_legacy_prf() {
        prf::legacy_prf(out, secret, label, seed);
    } else {
        prf::prf(out, suite.prf_hmac().with_key(secret).as_ref(), label, seed);
    }
}

fn join_randoms(first: &[u8; 32], second: &[u8; 32]) -> [u8; 64] {
    let mut randoms = [0u8; 64];
    randoms[..32].copy_from_slice(first);
    randoms[32..].copy_from_slice(second);
    randoms
}

/// The output of [`KeyScheduler::derive`].
pub struct SessionKeys {
    master_secret: MasterSecret,
    /// Keys protecting client-to-server records.
    pub client: DirectionalKeys,
    /// Keys protecting server-to-client records.
    pub server: DirectionalKeys,
}

impl SessionKeys {
    /// The master secret these keys were expanded from.
    pub fn master_secret(&self) -> &MasterSecret {
        &self.master_secret
    }
}

/// Record-protection keys for one direction, handed to the record layer.
#[derive(Clone, PartialEq, Eq)]
pub struct DirectionalKeys {
    /// The suite these keys belong to.
    pub suite: &'static SupportedCipherSuite,
    /// The version the key block was cut for.
    pub version: ProtocolVersion,
    /// MAC key; empty for AEAD suites.
    pub mac_key: Vec<u8>,
    /// Cipher key.
    pub key: Vec<u8>,
    /// Implicit IV or AEAD salt; may be empty.
    pub iv: Vec<u8>,
    /// Next record sequence number.
    pub seq: u64,
}

impl DirectionalKeys {
    fn new(
        suite: &'static SupportedCipherSuite,
        version: ProtocolVersion,
        mac_key: &[u8],
        key: &[u8],
        iv: &[u8],
    ) -> Self {
        Self {
            suite,
            version,
            mac_key: mac_key.to_vec(),
            key: key.to_vec(),
            iv: iv.to_vec(),
            seq: 0,
        }
    }
}

impl fmt::Debug for DirectionalKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectionalKeys")
            .field("suite", &self.suite)
            .field("version", &self.version)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

impl Drop for DirectionalKeys {
    fn drop(&mut self) {
        self.mac_key.zeroize();
        self.key.zeroize();
        self.iv.zeroize();
    }
}
