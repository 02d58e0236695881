//! Access control list middleware.
//!
//! Placed on individual routes inside the authenticated scope. It checks the claims left in the request extensions by
//! [`crate::middleware::JwtMiddlewareFactory`] against the roles the route requires. Every required role must be
//! present, otherwise a 403 Forbidden response is returned.
use std::{pin::Pin, rc::Rc};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;

use crate::{
    auth::{JwtClaims, Role},
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let roles = req.extensions().get::<JwtClaims>().map(|c| (c.sub, c.roles.clone()));
            let err = match roles {
                Some((_, roles)) if required_roles.iter().all(|role| roles.contains(role)) => {
                    let res = service.call(req).await?;
                    return Ok(res.map_into_left_body());
                },
                Some((buyer_id, _)) => {
                    let needed = required_roles.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ");
                    debug!("🔐️ Buyer #{buyer_id} does not have the required roles ({needed}) for {}", req.path());
                    AuthError::InsufficientPermissions(format!("This route requires the roles: {needed}"))
                },
                None => {
                    warn!("🔐️ No JWT claims found in request extensions for {}", req.path());
                    AuthError::MissingToken
                },
            };
            Ok(req.error_response(ServerError::AuthenticationError(err)).map_into_right_body())
        })
    }
}
