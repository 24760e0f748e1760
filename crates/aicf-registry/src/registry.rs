//! Provider registry: registration (gated by allowlist + pre-verified
//! attestation), capability/endpoint updates, status transitions.

use std::collections::HashMap;

use aicf_core::{Capability, ProviderId, ProviderStatus};

use crate::allowlist::Allowlist;
use crate::error::RegistryError;
use crate::provider::ProviderRecord;

pub struct Registry {
    allowlist: Allowlist,
    providers: HashMap<ProviderId, ProviderRecord>,
}

impl Registry {
    pub fn new(allowlist: Allowlist) -> Self {
        Self {
            allowlist,
            providers: HashMap::new(),
        }
    }

    /// Fails with `registry_denied` if the allowlist denies, or
    /// `attestation_invalid` if the caller's pre-verified attestation bit is
    /// false (attestation *verification* is out of scope; this consumes the
    /// already-verified result).
    pub fn register_provider(
        &mut self,
        provider_id: ProviderId,
        capabilities: Capability,
        endpoints: HashMap<String, String>,
        attestation_valid: bool,
        stake: u128,
        region: Option<String>,
    ) -> Result<&ProviderRecord, RegistryError> {
        if self.allowlist.is_denied(provider_id, region.as_deref()) {
            return Err(RegistryError::Denied);
        }
        if !attestation_valid {
            return Err(RegistryError::AttestationInvalid);
        }
        let record = ProviderRecord::new(provider_id, capabilities, endpoints, region, stake);
        self.providers.insert(provider_id, record);
        Ok(self.providers.get(&provider_id).unwrap())
    }

    pub fn get(&self, provider_id: ProviderId) -> Option<&ProviderRecord> {
        self.providers.get(&provider_id)
    }

    pub fn get_mut(&mut self, provider_id: ProviderId) -> Option<&mut ProviderRecord> {
        self.providers.get_mut(&provider_id)
    }

    pub fn list(&self) -> Vec<&ProviderRecord> {
        self.providers.values().collect()
    }

    pub fn set_status(
        &mut self,
        provider_id: ProviderId,
        status: ProviderStatus,
    ) -> Result<(), RegistryError> {
        let p = self
            .providers
            .get_mut(&provider_id)
            .ok_or(RegistryError::NotFound(provider_id))?;
        p.status = status;
        Ok(())
    }

    pub fn is_jailed(&self, provider_id: ProviderId) -> bool {
        self.providers
            .get(&provider_id)
            .map(|p| p.status == ProviderStatus::Jailed)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::Allowlist;
    use std::collections::HashSet;

    #[test]
    fn register_succeeds_when_allowed_and_attested() {
        let mut reg = Registry::new(Allowlist::default());
        let pid = ProviderId::from_bytes([1u8; 32]);
        let rec = reg
            .register_provider(pid, Capability::AI, HashMap::new(), true, 10_000, None)
            .unwrap();
        assert_eq!(rec.status, ProviderStatus::Active);
        assert!(reg.get(pid).is_some());
    }

    #[test]
    fn register_fails_when_denylisted() {
        let mut denied = HashSet::new();
        let pid = ProviderId::from_bytes([1u8; 32]);
        denied.insert(pid);
        let mut reg = Registry::new(Allowlist::new(denied, HashSet::new()));
        let err = reg
            .register_provider(pid, Capability::AI, HashMap::new(), true, 10_000, None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Denied));
    }

    #[test]
    fn register_fails_without_valid_attestation() {
        let mut reg = Registry::new(Allowlist::default());
        let pid = ProviderId::from_bytes([1u8; 32]);
        let err = reg
            .register_provider(pid, Capability::AI, HashMap::new(), false, 10_000, None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::AttestationInvalid));
    }

    #[test]
    fn set_status_updates_jailed_state() {
        let mut reg = Registry::new(Allowlist::default());
        let pid = ProviderId::from_bytes([1u8; 32]);
        reg.register_provider(pid, Capability::AI, HashMap::new(), true, 10_000, None)
            .unwrap();
        assert!(!reg.is_jailed(pid));
        reg.set_status(pid, ProviderStatus::Jailed).unwrap();
        assert!(reg.is_jailed(pid));
    }

    #[test]
    fn set_status_on_unknown_provider_errors() {
        let mut reg = Registry::new(Allowlist::default());
        let pid = ProviderId::from_bytes([9u8; 32]);
        assert!(reg.set_status(pid, ProviderStatus::Jailed).is_err());
    }
}
