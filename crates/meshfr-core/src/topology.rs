//! Topology store: authoritative TLV blob, version, and push validation
//! (spec.md §4, grounded on the original firmware's `topo_tlv.cpp` /
//! `topo_store.cpp`).

use meshfr_crypto::{PeerKey, SignatureAlgorithm, SignatureVerifier};

/// TLV item type codes, frozen to match the original firmware.
mod tlv_type {
    pub const NODE_ENTRY: u8 = 0x10;
    #[allow(dead_code)]
    pub const TOPO_VERSION: u8 = 0x11;
    pub const AUTH_HMAC: u8 = 0xF0;
    pub const AUTH_SIG: u8 = 0xF1;
}

/// One decoded `<type, value>` TLV item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvItem<'a> {
    /// The item's type byte.
    pub item_type: u8,
    /// The item's value bytes.
    pub value: &'a [u8],
}

/// Walk a TLV blob of `<type:1><len:1><value:len>` items, yielding each
/// in order. Stops (without error) at the first malformed length, mirroring
/// the original firmware's walker, which treats that as "no auth item
/// found" rather than a hard parse error.
fn iter_tlv(tlv: &[u8]) -> impl Iterator<Item = TlvItem<'_>> {
    let mut off = 0usize;
    std::iter::from_fn(move || {
        if off + 2 > tlv.len() {
            return None;
        }
        let item_type = tlv[off];
        let len = tlv[off + 1] as usize;
        off += 2;
        if off + len > tlv.len() {
            return None;
        }
        let value = &tlv[off..off + len];
        off += len;
        Some(TlvItem { item_type, value })
    })
}

/// Find the auth item, if any, and the byte range `[start, end)` of the
/// whole item (header + value) within `tlv`, so the caller can build the
/// signed prefix with the item excised.
fn find_auth_item(tlv: &[u8]) -> Option<(usize, usize, TlvItem<'_>)> {
    let mut off = 0usize;
    while off + 2 <= tlv.len() {
        let item_type = tlv[off];
        let len = tlv[off + 1] as usize;
        let value_start = off + 2;
        let value_end = value_start + len;
        if value_end > tlv.len() {
            return None;
        }
        if matches!(item_type, tlv_type::AUTH_HMAC | tlv_type::AUTH_SIG) {
            return Some((off, value_end, TlvItem { item_type, value: &tlv[value_start..value_end] }));
        }
        off = value_end;
    }
    None
}

/// Verify the auth item's tag/signature over `version ∥ tlv-with-item-
/// excised` (spec.md §4.7 step 3): an HMAC item is checked against the
/// per-peer application key, a signature item against the deployment
/// signature key. The wire format carries no algorithm selector for the
/// signature item (unlike `FwCommit`'s explicit `sig_algo`), so Ed25519
/// is assumed.
fn verify_auth_item(
    item: TlvItem<'_>,
    signed: &[u8],
    peer_key: &PeerKey,
    sig_verifier: &impl SignatureVerifier,
) -> bool {
    match item.item_type {
        tlv_type::AUTH_HMAC => {
            let Ok(candidate) = <[u8; meshfr_crypto::TAG_LEN]>::try_from(item.value) else {
                return false;
            };
            meshfr_crypto::verify_tag(peer_key, signed, &[], &candidate).is_ok()
        }
        tlv_type::AUTH_SIG => {
            use sha2::Digest as _;
            let digest: [u8; 32] = sha2::Sha256::digest(signed).into();
            sig_verifier.verify(SignatureAlgorithm::Ed25519, &digest, item.value).is_ok()
        }
        _ => false,
    }
}

/// Parsed view of the pieces a role adapter cares about, independent of
/// the raw TLV encoding.
#[derive(Debug, Clone, Default)]
pub struct TopologyProjection {
    /// Node-entry TLV values (type `0x10`), verbatim.
    pub node_entries: Vec<Vec<u8>>,
}

fn project(tlv: &[u8]) -> TopologyProjection {
    let mut projection = TopologyProjection::default();
    for item in iter_tlv(tlv) {
        if item.item_type == tlv_type::NODE_ENTRY {
            projection.node_entries.push(item.value.to_vec());
        }
    }
    projection
}

/// Holds the authoritative topology: version, raw TLV blob, and a parsed
/// projection for cheap role-adapter access.
#[derive(Debug, Clone, Default)]
pub struct TopologyStore {
    version: u16,
    blob: Vec<u8>,
    projection: TopologyProjection,
}

impl TopologyStore {
    /// An empty store (version 0, no blob) — the state of a freshly
    /// paired node before its first topology push.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Restore a store from persisted `(version, blob)`.
    #[must_use]
    pub fn from_persisted(version: u16, blob: Vec<u8>) -> Self {
        let projection = project(&blob);
        Self { version, blob, projection }
    }

    /// Current topology version. `0` means "never received a push".
    #[must_use]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Raw TLV blob as currently installed.
    #[must_use]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Parsed projection of the installed blob.
    #[must_use]
    pub fn projection(&self) -> &TopologyProjection {
        &self.projection
    }

    /// Validate and, if accepted, install a topology push. Mirrors
    /// `topo_apply_push_tlv`: requires an auth item whose tag/signature
    /// verifies against the per-peer application key (HMAC item) or the
    /// deployment signature key (signature item), plus a non-regressing
    /// version (spec.md §4.7 step 3). Returns `true` iff installed.
    #[must_use]
    pub fn apply_push(
        &mut self,
        header_version: u16,
        tlv: &[u8],
        peer_key: &PeerKey,
        sig_verifier: &impl SignatureVerifier,
    ) -> bool {
        if tlv.len() < 2 {
            return false;
        }
        let Some((item_start, item_end, auth_item)) = find_auth_item(tlv) else {
            return false;
        };
        let mut signed = Vec::with_capacity(tlv.len() + 2);
        signed.extend_from_slice(&header_version.to_le_bytes());
        signed.extend_from_slice(&tlv[..item_start]);
        signed.extend_from_slice(&tlv[item_end..]);
        if !verify_auth_item(auth_item, &signed, peer_key, sig_verifier) {
            return false;
        }
        if header_version < self.version {
            return false;
        }
        self.version = header_version;
        self.blob = tlv.to_vec();
        self.projection = project(tlv);
        true
    }

    /// Validate a topology token presented on a privileged frame (spec.md
    /// §4.5 step 9, §9 open question). The binding is intentionally weak
    /// today: it only checks that a topology has been installed and the
    /// token is non-zero. A zero token or an empty store always rejects.
    ///
    /// TODO: bind the token to `HMAC(key, version || target_role ||
    /// virtual_index || target_mac)` once that derivation is specified.
    #[must_use]
    pub fn validate_token(&self, token: &[u8; 16]) -> bool {
        self.version != 0 && *token != [0u8; 16]
    }
}
