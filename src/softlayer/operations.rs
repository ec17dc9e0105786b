//! Instance, SSH key and image lifecycle operations.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::instance::InstanceSpec;
use crate::template::TemplateId;

use super::types::{Deletion, ImageId, InstanceId, ResourceKind, SshKeyId};
use super::{DecodedResponse, HttpMethod, SoftlayerClient, SoftlayerError};

#[expect(clippy::expect_used, reason = "pattern is a compile-time constant")]
static IPV4_SHAPED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").expect("valid IPv4 pattern")
});

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SshKeyTemplateData<'a> {
    public_key: &'a str,
    label: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CaptureImageTemplateData<'a> {
    image_name: &'a str,
    image_description: &'a str,
}

/// Returns the first IPv4 address found anywhere in `text`.
///
/// The primary-IP endpoint answers with a bare JSON string whose exact shape
/// varies, so the address is pattern-matched rather than decoded.
#[must_use]
pub fn extract_ipv4(text: &str) -> Option<Ipv4Addr> {
    IPV4_SHAPED
        .find_iter(text)
        .find_map(|candidate| candidate.as_str().parse().ok())
}

/// Reads the identifier of a newly created instance from its creation
/// response.
#[must_use]
pub fn created_instance_id(response: &DecodedResponse) -> Option<InstanceId> {
    response.get("id").and_then(identifier).map(InstanceId::from)
}

/// Reads the identifier of a captured image from the capture response,
/// preferring its global identifier.
#[must_use]
pub fn captured_image_id(response: &DecodedResponse) -> Option<ImageId> {
    response
        .get("globalIdentifier")
        .and_then(identifier)
        .or_else(|| response.get("id").and_then(identifier))
        .map(ImageId::from)
}

fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

impl SoftlayerClient {
    /// Requests a new virtual guest.
    ///
    /// Host name and domain are sanitized first; the decoded creation response
    /// is returned as-is. Use [`created_instance_id`] to read the new
    /// identifier and [`SoftlayerClient::wait_for_ready`] to block until the
    /// guest is usable.
    ///
    /// # Errors
    ///
    /// Returns [`SoftlayerError::Validation`] when sanitization leaves a
    /// required field empty, and any template, transport or decode failure.
    pub async fn create_instance(
        &self,
        spec: &InstanceSpec,
    ) -> Result<DecodedResponse, SoftlayerError> {
        let sanitized = spec.sanitized();
        sanitized.validate()?;

        let body = self.render_body(TemplateId::CreateInstance, &sanitized.template_data())?;
        let created = self
            .send(
                HttpMethod::Post,
                "SoftLayer_Virtual_Guest/createObject.json",
                Some(body),
            )
            .await?;

        info!(
            host_name = %sanitized.host_name,
            domain = %sanitized.domain,
            instance_id = ?created_instance_id(&created),
            "instance creation accepted"
        );
        Ok(created)
    }

    /// Deletes a virtual guest.
    ///
    /// # Errors
    ///
    /// Returns [`SoftlayerError::Transport`] when the call fails.
    pub async fn destroy_instance(
        &self,
        instance_id: &InstanceId,
    ) -> Result<Deletion, SoftlayerError> {
        self.delete(
            ResourceKind::Instance,
            instance_id.as_str(),
            &format!("SoftLayer_Virtual_Guest/{instance_id}.json"),
        )
        .await
    }

    /// Uploads a public key and returns the provider's identifier for it.
    ///
    /// # Errors
    ///
    /// Returns [`SoftlayerError::MissingField`] when the response carries no
    /// numeric `id`, and any template, transport or decode failure.
    pub async fn upload_ssh_key(
        &self,
        label: &str,
        public_key: &str,
    ) -> Result<SshKeyId, SoftlayerError> {
        const PATH: &str = "SoftLayer_Security_Ssh_Key/createObject.json";

        let body = self.render_body(
            TemplateId::CreateSshKey,
            &SshKeyTemplateData { public_key, label },
        )?;
        let created = self.send(HttpMethod::Post, PATH, Some(body)).await?;

        let key_id = created
            .get("id")
            .and_then(|value| {
                value
                    .as_u64()
                    .or_else(|| value.as_str().and_then(|text| text.parse().ok()))
            })
            .map(SshKeyId::new)
            .ok_or_else(|| SoftlayerError::MissingField {
                field: "id".to_owned(),
                path: PATH.to_owned(),
            })?;

        info!(%key_id, label, "ssh key uploaded");
        Ok(key_id)
    }

    /// Deletes an uploaded SSH key.
    ///
    /// # Errors
    ///
    /// Returns [`SoftlayerError::Transport`] when the call fails.
    pub async fn destroy_ssh_key(&self, key_id: SshKeyId) -> Result<Deletion, SoftlayerError> {
        self.delete(
            ResourceKind::SshKey,
            &key_id.to_string(),
            &format!("SoftLayer_Security_Ssh_Key/{key_id}.json"),
        )
        .await
    }

    /// Captures the instance's disks as a reusable image.
    ///
    /// # Errors
    ///
    /// Returns any template, transport or decode failure.
    pub async fn capture_image(
        &self,
        instance_id: &InstanceId,
        image_name: &str,
        image_description: &str,
    ) -> Result<DecodedResponse, SoftlayerError> {
        let body = self.render_body(
            TemplateId::CaptureImage,
            &CaptureImageTemplateData {
                image_name,
                image_description,
            },
        )?;
        let captured = self
            .send(
                HttpMethod::Post,
                &format!("SoftLayer_Virtual_Guest/{instance_id}/captureImage.json"),
                Some(body),
            )
            .await?;

        info!(
            %instance_id,
            image_name,
            image_id = ?captured_image_id(&captured),
            "image capture accepted"
        );
        Ok(captured)
    }

    /// Deletes a captured image.
    ///
    /// # Errors
    ///
    /// Returns [`SoftlayerError::Transport`] when the call fails.
    pub async fn destroy_image(&self, image_id: &ImageId) -> Result<Deletion, SoftlayerError> {
        self.delete(
            ResourceKind::Image,
            image_id.as_str(),
            &format!("SoftLayer_Virtual_Guest_Block_Device_Template_Group/{image_id}.json"),
        )
        .await
    }

    /// Returns the instance's primary public IPv4 address.
    ///
    /// # Errors
    ///
    /// Returns [`SoftlayerError::Transport`] when the call fails and
    /// [`SoftlayerError::MissingPublicIp`] when the answer holds no address.
    pub async fn public_ip(&self, instance_id: &InstanceId) -> Result<Ipv4Addr, SoftlayerError> {
        let response = self
            .send_raw(
                HttpMethod::Get,
                &format!("SoftLayer_Virtual_Guest/{instance_id}/getPrimaryIpAddress.json"),
                None,
            )
            .await?;

        extract_ipv4(&String::from_utf8_lossy(&response)).ok_or_else(|| {
            SoftlayerError::MissingPublicIp {
                instance_id: instance_id.to_string(),
            }
        })
    }

    /// Calls an arbitrary API path and decodes the answer.
    ///
    /// `method` must be exactly `GET`, `POST` or `DELETE`.
    ///
    /// # Errors
    ///
    /// Returns [`SoftlayerError::UnsupportedMethod`] without sending anything
    /// when `method` is not supported, otherwise any transport or decode
    /// failure.
    pub async fn call(
        &self,
        method: &str,
        path: &str,
        body: Option<&Value>,
    ) -> Result<DecodedResponse, SoftlayerError> {
        let method: HttpMethod = method.parse()?;
        let payload = body.map(|value| value.to_string().into_bytes());
        self.send(method, path.trim_start_matches('/'), payload).await
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        id: &str,
        path: &str,
    ) -> Result<Deletion, SoftlayerError> {
        let response = self.send_raw(HttpMethod::Delete, path, None).await?;
        let text = String::from_utf8_lossy(&response).into_owned();
        info!(%kind, id, response = %text, "deletion acknowledged");
        Ok(Deletion {
            kind,
            id: id.to_owned(),
            response: text,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case(r#"{"ipAddress":"10.20.30.40","other":"x"}"#, Some([10, 20, 30, 40]))]
    #[case(r#""169.45.12.7""#, Some([169, 45, 12, 7]))]
    #[case("version 1.2.3 then 999.1.1.1 then 8.8.4.4", Some([8, 8, 4, 4]))]
    #[case(r#"{"error":"not found"}"#, None)]
    fn extract_ipv4_finds_first_address(#[case] text: &str, #[case] expected: Option<[u8; 4]>) {
        assert_eq!(extract_ipv4(text), expected.map(Ipv4Addr::from));
    }

    #[test]
    fn created_instance_id_accepts_numbers_and_strings() {
        let numeric = json!({"id": 12345}).as_object().cloned().expect("object");
        let textual = json!({"id": "98765"}).as_object().cloned().expect("object");
        assert_eq!(created_instance_id(&numeric), Some(InstanceId::from("12345")));
        assert_eq!(created_instance_id(&textual), Some(InstanceId::from("98765")));
    }

    #[test]
    fn captured_image_id_prefers_global_identifier() {
        let response = json!({"id": 7, "globalIdentifier": "0a1b-2c3d"})
            .as_object()
            .cloned()
            .expect("object");
        assert_eq!(captured_image_id(&response), Some(ImageId::from("0a1b-2c3d")));

        let fallback = json!({"id": 7}).as_object().cloned().expect("object");
        assert_eq!(captured_image_id(&fallback), Some(ImageId::from("7")));
    }
}
