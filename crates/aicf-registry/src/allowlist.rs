use std::collections::HashSet;

use aicf_core::ProviderId;

#[derive(Clone, Debug, Default)]
pub struct Allowlist {
    denied_ids: HashSet<ProviderId>,
    denied_regions: HashSet<String>,
}

impl Allowlist {
    pub fn new(denied_ids: HashSet<ProviderId>, denied_regions: HashSet<String>) -> Self {
        Self {
            denied_ids,
            denied_regions,
        }
    }

    pub fn is_denied(&self, provider_id: ProviderId, region: Option<&str>) -> bool {
        self.denied_ids.contains(&provider_id)
            || region
                .map(|r| self.denied_regions.contains(r))
                .unwrap_or(false)
    }
}
