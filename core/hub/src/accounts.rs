//! Account details across every configured provider.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use vidrelay_common::{AccountInfo, Error, ProviderId, Result};
use vidrelay_providers::ProviderRegistry;
use vidrelay_store::CredentialStore;

/// One provider's slot in the aggregated view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountEntry {
    Failed { error: String },
    Info(AccountInfo),
}

/// Fetch account details for every provider the user has a credential for.
///
/// Providers are queried concurrently. A provider that fails contributes an
/// `{error}` entry, including one whose adapter panics; providers without a
/// credential are left out.
pub async fn aggregate_accounts(
    registry: &ProviderRegistry,
    credentials: &Arc<dyn CredentialStore>,
    user_id: &str,
) -> Result<BTreeMap<ProviderId, AccountEntry>> {
    let mut lookups = Vec::new();
    for provider in credentials.configured(user_id)? {
        let Some(credential) = credentials.get(user_id, provider)? else {
            continue;
        };
        lookups.push(async move {
            let lookup = async {
                let adapter = registry.get(provider)?;
                adapter.account_info(&credential).await
            };
            let entry = match AssertUnwindSafe(lookup).catch_unwind().await {
                Ok(Ok(info)) => AccountEntry::Info(info),
                Ok(Err(e)) => {
                    warn!("{} account lookup failed: {}", provider.display_name(), e);
                    AccountEntry::Failed {
                        error: entry_message(&e),
                    }
                }
                Err(_) => {
                    error!("{} adapter panicked during account lookup", provider.display_name());
                    AccountEntry::Failed {
                        error: format!(
                            "{} account lookup failed unexpectedly",
                            provider.display_name()
                        ),
                    }
                }
            };
            (provider, entry)
        });
    }

    Ok(join_all(lookups).await.into_iter().collect())
}

fn entry_message(err: &Error) -> String {
    match err {
        Error::NotFound(_) => "Provider not available".to_string(),
        other => other.to_string(),
    }
}
