use actix_governor::governor::middleware::StateInformationMiddleware;
use actix_governor::{
    GovernorConfig, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError,
};
use actix_web::dev::ServiceRequest;
use actix_web::HttpMessage;
use anyhow::anyhow;

use crate::auth::ACCESS_TOKEN_COOKIE;
use crate::model::configuration::ApplicationConfiguration;

/// Rate limit per token: the bearer header, the access token cookie, or the peer ip for
/// anonymous calls
#[derive(Clone)]
pub struct UserToken;

impl KeyExtractor for UserToken {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> Result<Self::Key, Self::KeyExtractionError> {
        let auth = req
            .headers()
            .get("Authorization")
            .and_then(|token| token.to_str().ok())
            .map(|token| token.trim().to_owned())
            .or_else(|| {
                req.cookie(ACCESS_TOKEN_COOKIE)
                    .map(|cookie| cookie.value().to_owned())
            });

        if let Some(auth) = auth {
            return Ok(auth);
        }

        req.request()
            .peer_addr()
            .map(|x| x.ip().to_string())
            .ok_or_else(|| SimpleKeyExtractionError::new("Can't extract key"))
    }
}

pub fn build_rate_limiting_conf(
    configuration: &ApplicationConfiguration,
) -> anyhow::Result<GovernorConfig<UserToken, StateInformationMiddleware>> {
    GovernorConfigBuilder::default()
        .per_second(configuration.rate_limiting_fill_rate)
        .burst_size(configuration.rate_limiting_bucket_size)
        .key_extractor(UserToken)
        .use_headers()
        .finish()
        .ok_or_else(|| anyhow!("Invalid rate limiting configuration"))
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;
    use secrecy::Secret;

    use super::*;

    #[test]
    fn key_is_the_token_or_the_peer_ip() {
        let with_token = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc"))
            .to_srv_request();
        assert_eq!(UserToken.extract(&with_token).unwrap(), "Bearer abc");

        let anonymous = TestRequest::default()
            .peer_addr("10.0.0.1:4242".parse().unwrap())
            .to_srv_request();
        assert_eq!(UserToken.extract(&anonymous).unwrap(), "10.0.0.1");
    }

    #[test]
    fn configuration_is_built_from_application_configuration() {
        let configuration = ApplicationConfiguration::new(Secret::new("secret".to_owned()));

        assert!(build_rate_limiting_conf(&configuration).is_ok());
    }
}
