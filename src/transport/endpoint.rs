// src/transport/endpoint.rs

use crate::error::VimError;

use url::Url;

/// Fixed path of the service description below the management host. The
/// path convention is not configurable per call.
pub(crate) const SERVICE_PATH: &str = "/sdk/vimService.wsdl";

/// Derives the service endpoint URL for a host:
/// `https://<host>/sdk/vimService.wsdl`.
///
/// The host may carry an explicit port (`vcsa.example.com:8443`). Anything
/// that does not survive as a bare authority component is rejected eagerly,
/// so a misconfigured host fails at client creation rather than inside the
/// first handshake.
pub fn service_endpoint(host: &str) -> Result<Url, VimError> {
  let host = host.trim();
  if host.is_empty() {
    return Err(VimError::InvalidEndpoint("empty host".into()));
  }

  let raw = format!("https://{}{}", host, SERVICE_PATH);
  let url = match Url::parse(&raw) {
    Ok(url) => url,
    Err(e) => return Err(VimError::InvalidEndpoint(format!("{}: {}", host, e))),
  };

  // A host containing a path, query, or credentials would smuggle itself
  // past Url::parse by shifting the fixed path.
  if url.host_str().is_none() || url.path() != SERVICE_PATH || url.query().is_some() {
    return Err(VimError::InvalidEndpoint(host.to_string()));
  }
  if !url.username().is_empty() || url.password().is_some() {
    return Err(VimError::InvalidEndpoint(host.to_string()));
  }

  Ok(url)
}
