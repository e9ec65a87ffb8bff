//! Act-request helpers for REST-style endpoints

use std::fmt::Display;

use reqwest::Method;
use serde::Serialize;

use crate::error::FixtureError;
use crate::fixture::ApiFixture;
use crate::http::RequestBody;
use crate::uri::{entity_path, with_query};

pub trait RestExt: ApiFixture {
    /// Act request with a fixed method and URI and no body.
    #[must_use]
    fn when(self, method: Method, uri: impl Into<String>) -> Self {
        self.when_with_body(method, uri, None)
    }

    #[must_use]
    fn when_with_body(
        self,
        method: Method,
        uri: impl Into<String>,
        body: Option<RequestBody>,
    ) -> Self {
        let uri = uri.into();
        self.configure_act_request(move |request| {
            request.method = method;
            request.uri = uri;
            request.body = body;
        })
    }

    /// Act request whose URI is computed when the run builds it, e.g. from a
    /// [`Captured`](crate::Captured) value.
    #[must_use]
    fn when_with<U>(self, method: Method, uri: U, body: Option<RequestBody>) -> Self
    where
        U: FnOnce() -> Result<String, FixtureError> + 'static,
    {
        self.try_configure_act_request(move |request| {
            request.method = method;
            request.uri = uri()?;
            request.body = body;
            Ok(())
        })
    }

    #[must_use]
    fn when_getting(self, uri: impl Into<String>) -> Self {
        self.when(Method::GET, uri)
    }

    #[must_use]
    fn when_getting_with_query<Q: Serialize + ?Sized>(self, path: &str, query: &Q) -> Self {
        let uri = with_query(path, query);
        self.try_configure_act_request(move |request| {
            request.method = Method::GET;
            request.uri = uri?;
            Ok(())
        })
    }

    /// `GET entity/{id}`
    #[must_use]
    fn when_getting_by_id(self, entity: &str, id: impl Display) -> Self {
        self.when(Method::GET, entity_path(entity, id))
    }

    /// `POST entity` with a JSON body.
    #[must_use]
    fn when_creating<B: Serialize + ?Sized>(self, entity: &str, body: &B) -> Self {
        self.when_calling_rest_method(Method::POST, entity, Some(body))
    }

    /// `PUT entity/{id}` with a JSON body.
    #[must_use]
    fn when_updating<B: Serialize + ?Sized>(
        self,
        entity: &str,
        id: impl Display,
        body: &B,
    ) -> Self {
        self.when_calling_rest_method(Method::PUT, &entity_path(entity, id), Some(body))
    }

    /// `PUT entity` with a JSON body.
    #[must_use]
    fn when_updating_collection<B: Serialize + ?Sized>(self, entity: &str, body: &B) -> Self {
        self.when_calling_rest_method(Method::PUT, entity, Some(body))
    }

    /// `PATCH entity/{id}` with a JSON body.
    #[must_use]
    fn when_patching<B: Serialize + ?Sized>(
        self,
        entity: &str,
        id: impl Display,
        body: &B,
    ) -> Self {
        self.when_calling_rest_method(Method::PATCH, &entity_path(entity, id), Some(body))
    }

    /// `DELETE entity/{id}`
    #[must_use]
    fn when_deleting(self, entity: &str, id: impl Display) -> Self {
        self.when(Method::DELETE, entity_path(entity, id))
    }

    /// Act request with an optional JSON body, serialized now.
    #[must_use]
    fn when_calling_rest_method<B: Serialize + ?Sized>(
        self,
        method: Method,
        uri: &str,
        body: Option<&B>,
    ) -> Self {
        let body = body.map(RequestBody::json).transpose();
        let uri = uri.to_string();
        self.try_configure_act_request(move |request| {
            request.method = method;
            request.uri = uri;
            request.body = body?;
            Ok(())
        })
    }
}

impl<F: ApiFixture> RestExt for F {}
