use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::{lookup_host, UdpSocket};
use tracing::{debug, info, warn};

use crate::config::EnvSource;
use crate::network::wifi;

/// Any routable public address works; the socket is connected, never written to.
const PROBE_TARGET: (Ipv4Addr, u16) = (Ipv4Addr::new(8, 8, 8, 8), 80);
const CLOUD_PLACEHOLDER_URL: &str = "https://your-domain.com/";
const CLOUD_SSID: &str = "Cloud Network";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudPlatform {
    Vercel,
    Heroku,
    Railway,
    Render,
    AwsLambda,
    GoogleCloud,
    AzureFunctions,
}

impl CloudPlatform {
    /// Indicator variables in detection priority order.
    const INDICATORS: [(CloudPlatform, &'static str); 7] = [
        (CloudPlatform::Vercel, "VERCEL"),
        (CloudPlatform::Heroku, "HEROKU_APP_NAME"),
        (CloudPlatform::Railway, "RAILWAY_ENVIRONMENT"),
        (CloudPlatform::Render, "RENDER"),
        (CloudPlatform::AwsLambda, "AWS_LAMBDA_FUNCTION_NAME"),
        (CloudPlatform::GoogleCloud, "GOOGLE_CLOUD_PROJECT"),
        (CloudPlatform::AzureFunctions, "AZURE_FUNCTIONS_ENVIRONMENT"),
    ];

    pub fn detect(source: &impl EnvSource) -> Option<CloudPlatform> {
        Self::INDICATORS
            .iter()
            .find(|(_, name)| env_present(source, name))
            .map(|(platform, _)| *platform)
    }

    pub fn name(self) -> &'static str {
        match self {
            CloudPlatform::Vercel => "Vercel",
            CloudPlatform::Heroku => "Heroku",
            CloudPlatform::Railway => "Railway",
            CloudPlatform::Render => "Render",
            CloudPlatform::AwsLambda => "AWS Lambda",
            CloudPlatform::GoogleCloud => "Google Cloud",
            CloudPlatform::AzureFunctions => "Azure Functions",
        }
    }
}

fn env_present(source: &impl EnvSource, name: &str) -> bool {
    source
        .var(name)
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAddress {
    Detected(IpAddr),
    Cloud,
    Undetectable,
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostAddress::Detected(ip) => write!(f, "{ip}"),
            HostAddress::Cloud => f.write_str("Cloud Environment"),
            HostAddress::Undetectable => f.write_str("Unable to detect"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeploymentContext {
    pub platform: Option<CloudPlatform>,
    pub host_ip: HostAddress,
    pub wifi_ssid: String,
    pub port: u16,
    cloud_url: String,
}

impl DeploymentContext {
    pub fn local(host_ip: HostAddress, wifi_ssid: impl Into<String>, port: u16) -> Self {
        DeploymentContext {
            platform: None,
            host_ip,
            wifi_ssid: wifi_ssid.into(),
            port,
            cloud_url: CLOUD_PLACEHOLDER_URL.to_string(),
        }
    }

    pub fn cloud(platform: CloudPlatform, source: &impl EnvSource, port: u16) -> Self {
        DeploymentContext {
            platform: Some(platform),
            host_ip: HostAddress::Cloud,
            wifi_ssid: CLOUD_SSID.to_string(),
            port,
            cloud_url: suggested_cloud_url(source),
        }
    }

    pub fn is_cloud(&self) -> bool {
        self.platform.is_some()
    }

    pub fn platform_name(&self) -> &'static str {
        self.platform
            .map(CloudPlatform::name)
            .unwrap_or("Unknown Cloud Platform")
    }

    pub fn suggested_web_app_url(&self) -> String {
        if self.is_cloud() {
            return self.cloud_url.clone();
        }
        match self.host_ip {
            HostAddress::Detected(ip) => format!("http://{}/", SocketAddr::new(ip, self.port)),
            HostAddress::Cloud | HostAddress::Undetectable => {
                format!("http://localhost:{}/", self.port)
            }
        }
    }
}

fn suggested_cloud_url(source: &impl EnvSource) -> String {
    let non_empty = |name: &str| {
        source
            .var(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    if let Some(host) = non_empty("VERCEL_URL") {
        return format!("https://{host}/");
    }
    if let Some(app) = non_empty("HEROKU_APP_NAME") {
        return format!("https://{app}.herokuapp.com/");
    }
    CLOUD_PLACEHOLDER_URL.to_string()
}

async fn outbound_interface_ip() -> io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.connect(PROBE_TARGET).await?;
    let ip = socket.local_addr()?.ip();
    if ip.is_unspecified() {
        return Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "socket reported an unspecified local address",
        ));
    }
    Ok(ip)
}

async fn hostname_ip() -> io::Result<IpAddr> {
    let name = hostname::get()?.into_string().map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidData, "hostname is not valid UTF-8")
    })?;
    let addresses: Vec<SocketAddr> = lookup_host((name.as_str(), 0)).await?.collect();
    addresses
        .iter()
        .find(|address| address.is_ipv4())
        .map(|address| address.ip())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("hostname {name} has no IPv4 address"),
            )
        })
}

async fn detect_host_ip() -> HostAddress {
    match outbound_interface_ip().await {
        Ok(ip) => return HostAddress::Detected(ip),
        Err(err) => debug!("Outbound socket probe failed: {err}"),
    }
    match hostname_ip().await {
        Ok(ip) => HostAddress::Detected(ip),
        Err(err) => {
            warn!("Unable to detect host IP: {err}");
            HostAddress::Undetectable
        }
    }
}

/// Best-effort deployment detection. Never fails; unknown values degrade to
/// sentinels.
pub async fn probe(source: &impl EnvSource, port: u16) -> DeploymentContext {
    if let Some(platform) = CloudPlatform::detect(source) {
        let context = DeploymentContext::cloud(platform, source, port);
        info!(
            "Detected cloud deployment on {} (suggested url {})",
            platform.name(),
            context.suggested_web_app_url()
        );
        return context;
    }

    let host_ip = detect_host_ip().await;
    let wifi_ssid = wifi::detect_ssid().await;
    let context = DeploymentContext::local(host_ip, wifi_ssid, port);
    info!(
        "Detected local deployment: host_ip={} wifi={} suggested_url={}",
        context.host_ip,
        context.wifi_ssid,
        context.suggested_web_app_url()
    );
    context
}

pub fn network_status(context: &DeploymentContext, current_web_app_url: Option<&str>) -> String {
    let mut status = if context.is_cloud() {
        format!(
            "🌐 *Cloud Deployment Information:*\n\n\
             ☁️ Platform: {}\n\
             🌍 Environment: Cloud/Production\n\
             🔗 Suggested Web App URL: {}\n\n\
             💡 *For Cloud Deployment:*\n\
             - Use your actual domain URL\n\
             - Example: https://yourdomain.com/\n\
             - Vercel URL: https://your-app.vercel.app/\n",
            context.platform_name(),
            context.suggested_web_app_url()
        )
    } else {
        let suggested = context.suggested_web_app_url();
        format!(
            "🌐 *Local Network Information:*\n\n\
             📍 Host IP Address: {}\n\
             📶 WiFi Network: {}\n\
             🔗 Local Web App URL: {}\n\n\
             💡 *Suggested Web App URLs:*\n\
             - Local Network: {}\n\
             - Localhost: http://localhost:{}/\n",
            context.host_ip, context.wifi_ssid, suggested, suggested, context.port
        )
    };
    status.push_str(&format!(
        "- Current Config: {}",
        current_web_app_url.unwrap_or("Not configured")
    ));
    status
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn detects_platform_in_priority_order() {
        let env = source(&[("RENDER", "true"), ("HEROKU_APP_NAME", "demo")]);
        assert_eq!(CloudPlatform::detect(&env), Some(CloudPlatform::Heroku));
    }

    #[test]
    fn empty_indicator_does_not_count_as_cloud() {
        let env = source(&[("VERCEL", "  "), ("GOOGLE_CLOUD_PROJECT", "")]);
        assert_eq!(CloudPlatform::detect(&env), None);
    }

    #[tokio::test]
    async fn cloud_probe_uses_platform_hints() {
        let env = source(&[("VERCEL", "1"), ("VERCEL_URL", "my-app.vercel.app")]);
        let context = probe(&env, 5000).await;
        assert!(context.is_cloud());
        assert_eq!(context.platform_name(), "Vercel");
        assert_eq!(context.host_ip, HostAddress::Cloud);
        assert_eq!(context.wifi_ssid, "Cloud Network");
        assert_eq!(context.suggested_web_app_url(), "https://my-app.vercel.app/");
    }

    #[test]
    fn cloud_url_falls_back_to_heroku_then_placeholder() {
        let heroku = DeploymentContext::cloud(
            CloudPlatform::Heroku,
            &source(&[("HEROKU_APP_NAME", "shop")]),
            5000,
        );
        assert_eq!(heroku.suggested_web_app_url(), "https://shop.herokuapp.com/");

        let render = DeploymentContext::cloud(CloudPlatform::Render, &source(&[]), 5000);
        assert_eq!(render.suggested_web_app_url(), "https://your-domain.com/");
    }

    #[test]
    fn local_url_uses_detected_ip_or_localhost() {
        let ip = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20));
        let detected = DeploymentContext::local(HostAddress::Detected(ip), "Home", 8080);
        assert_eq!(detected.suggested_web_app_url(), "http://192.168.1.20:8080/");

        let unknown = DeploymentContext::local(HostAddress::Undetectable, "Unknown", 5000);
        assert_eq!(unknown.suggested_web_app_url(), "http://localhost:5000/");
        assert_eq!(unknown.host_ip.to_string(), "Unable to detect");
    }

    #[test]
    fn status_reports_current_configuration() {
        let context = DeploymentContext::local(HostAddress::Undetectable, "Unknown", 5000);
        let status = network_status(&context, None);
        assert!(status.contains("Host IP Address: Unable to detect"));
        assert!(status.ends_with("- Current Config: Not configured"));

        let cloud = DeploymentContext::cloud(CloudPlatform::Railway, &source(&[]), 5000);
        let status = network_status(&cloud, Some("https://example.com/"));
        assert!(status.contains("Platform: Railway"));
        assert!(status.ends_with("- Current Config: https://example.com/"));
    }
}
