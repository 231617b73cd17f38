// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Conversions from mdns-sd types

use core::net::IpAddr;
use thread_discovery::{ResolvedService, TxtRecords};

/// Instance label of a full mDNS service name
///
/// `OpenThread BR #1._meshcop._udp.local.` becomes `OpenThread BR #1`. Names
/// without the service suffix are returned unchanged.
pub fn instance_label(full_name: &str, service_type: &str) -> String {
    full_name
        .strip_suffix(service_type)
        .and_then(|rest| rest.strip_suffix('.'))
        .unwrap_or(full_name)
        .to_string()
}

/// Convert a scoped IP to an `IpAddr`, dropping any zone ID
fn scoped_ip_to_ip_addr(host: &mdns_sd::ScopedIp) -> Option<IpAddr> {
    let host = host.to_string();
    let host = host.split('%').next().unwrap_or(&host);
    host.parse().ok()
}

/// Pick the address to petition: IPv4, then routable IPv6, then anything
pub(crate) fn pick_address(addresses: impl IntoIterator<Item = IpAddr>) -> Option<IpAddr> {
    let addresses: Vec<IpAddr> = addresses.into_iter().collect();
    let link_local = |addr: &IpAddr| match addr {
        IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) == 0xfe80,
        IpAddr::V4(_) => false,
    };
    addresses
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addresses.iter().find(|addr| !link_local(addr)))
        .or_else(|| addresses.first())
        .copied()
}

/// Copy TXT properties, keeping binary values intact
pub(crate) fn txt_records(properties: &mdns_sd::TxtProperties) -> TxtRecords {
    properties
        .iter()
        .map(|prop| (prop.key().to_string(), prop.val().unwrap_or_default().to_vec()))
        .collect()
}

/// Build a [`ResolvedService`] from an mdns-sd resolution
///
/// Returns `None` if the service has no usable address.
pub(crate) fn resolved_from_mdns(
    info: &mdns_sd::ResolvedService,
    service_type: &str,
) -> Option<ResolvedService> {
    let host = pick_address(info.get_addresses().iter().filter_map(scoped_ip_to_ip_addr))?;
    Some(ResolvedService {
        instance_name: instance_label(info.get_fullname(), service_type),
        host,
        port: info.get_port(),
        txt: txt_records(info.get_properties()),
    })
}
