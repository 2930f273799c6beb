//! `route` and its staged attributes.
//!
//! add, set, del and attribute sets only stage changes; the commit of the
//! route instance turns the staged object into one backend call. The value
//! of the route node itself is its kernel flags (`mod dyn reinstate`).

use crate::backend::{Backend, RouteChange};
use crate::error::{Error, Result};
use crate::host::Host;
use crate::key::{RouteFlags, RouteKey, decode_route, encode_route};
use crate::staging::{GroupId, ObjectType, StagedAction, StagedObject};
use crate::tree::agent::Agent;

/// Staged route attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RouteAttr {
    Metric,
    /// Maximum segment size, carried as `mss` in the instance name.
    Mtu,
    Win,
    Irtt,
}

impl RouteAttr {
    const ALL: [Self; 4] = [Self::Metric, Self::Mtu, Self::Win, Self::Irtt];

    fn name(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Mtu => "mtu",
            Self::Win => "win",
            Self::Irtt => "irtt",
        }
    }

    fn read(self, key: &RouteKey) -> Option<u32> {
        match self {
            Self::Metric => key.metric(),
            Self::Mtu => key.mss(),
            Self::Win => key.window(),
            Self::Irtt => key.irtt(),
        }
    }

    fn write(self, key: &mut RouteKey, value: Option<u32>) {
        match self {
            Self::Metric => key.set_metric(value),
            Self::Mtu => key.set_mss(value),
            Self::Win => key.set_window(value),
            Self::Irtt => key.set_irtt(value),
        }
    }
}

/// Staged name of the route flags.
const FLAGS_ATTR: &str = "flags";

fn parse_attr_value(attr: RouteAttr, value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| Error::InvalidValue(format!("invalid route {}: {:?}", attr.name(), value)))
}

/// `key` with the staged attributes applied; 0 clears an attribute.
fn apply_attrs(mut key: RouteKey, obj: &StagedObject) -> Result<RouteKey> {
    for attr in RouteAttr::ALL {
        if let Some(value) = obj.attr(attr.name()) {
            let value = parse_attr_value(attr, value)?;
            attr.write(&mut key, (value != 0).then_some(value));
        }
    }
    if let Some(flags) = obj.attr(FLAGS_ATTR) {
        key.set_flags(RouteFlags::parse(flags)?);
    }
    Ok(key)
}

/// Every staged attribute of `live`, as the loader seeds them.
fn live_attrs(live: &RouteKey) -> Vec<(String, String)> {
    let mut attrs: Vec<(String, String)> = RouteAttr::ALL
        .iter()
        .map(|a| (a.name().to_owned(), a.read(live).unwrap_or(0).to_string()))
        .collect();
    attrs.push((FLAGS_ATTR.to_owned(), live.flags().to_string()));
    attrs
}

/// The live route named by `key`.
async fn live_route<B: Backend>(backend: &mut B, key: &RouteKey) -> Result<RouteKey> {
    backend
        .routes()
        .await?
        .into_iter()
        .find(|r| key.matches(r))
        .ok_or_else(|| Error::not_found(format!("route {}", key)))
}

/// Decode an instance name, returning the key and its canonical name.
fn route_instance(text: &str) -> Result<(RouteKey, String)> {
    let key = decode_route(text)?;
    let name = encode_route(&key);
    Ok((key, name))
}

impl<B: Backend, H: Host> Agent<B, H> {
    /// Flags of the live route; empty when it has none.
    pub(crate) async fn route_get(&mut self, instance: &str) -> Result<String> {
        let (key, _) = route_instance(instance)?;
        let live = live_route(&mut self.backend, &key).await?;
        Ok(live.flags().to_string())
    }

    /// Stage creation of the route with the flags given in `value`.
    pub(crate) fn route_add(&mut self, group: GroupId, instance: &str, value: &str) -> Result<()> {
        let (_, name) = route_instance(instance)?;
        let flags = RouteFlags::parse(value)?;
        self.staged.stage_add(ObjectType::Route, &name, group)?;
        if !flags.is_empty() {
            self.staged
                .stage_set(ObjectType::Route, &name, group, FLAGS_ATTR, &flags.to_string());
        }
        Ok(())
    }

    /// Stage new flags for a live route.
    pub(crate) async fn route_set(&mut self, group: GroupId, instance: &str, value: &str) -> Result<()> {
        let (key, name) = route_instance(instance)?;
        let flags = RouteFlags::parse(value)?;

        let backend = &mut self.backend;
        self.staged
            .stage_set_with(
                ObjectType::Route,
                &name,
                group,
                FLAGS_ATTR,
                &flags.to_string(),
                async || Ok(live_attrs(&live_route(backend, &key).await?)),
            )
            .await
    }

    /// Stage deletion of a live route. Deleting a route whose creation is
    /// still staged drops the staged creation instead.
    pub(crate) async fn route_del(&mut self, group: GroupId, instance: &str) -> Result<()> {
        let (key, name) = route_instance(instance)?;
        if self
            .staged
            .get(ObjectType::Route, &name)
            .is_some_and(|obj| obj.action == StagedAction::Create && obj.group == group)
        {
            self.staged.take(ObjectType::Route, &name);
            return Ok(());
        }
        live_route(&mut self.backend, &key).await?;
        self.staged.stage_delete(ObjectType::Route, &name, group);
        Ok(())
    }

    pub(crate) async fn route_attr_get(&mut self, instance: &str, attr: RouteAttr) -> Result<String> {
        let (key, _) = route_instance(instance)?;
        let live = live_route(&mut self.backend, &key).await?;
        Ok(attr.read(&live).unwrap_or(0).to_string())
    }

    /// Stage an attribute. The first write under a route seeds the staged
    /// object with the live attribute values.
    pub(crate) async fn route_attr_set(
        &mut self,
        group: GroupId,
        instance: &str,
        attr: RouteAttr,
        value: &str,
    ) -> Result<()> {
        let (key, name) = route_instance(instance)?;
        parse_attr_value(attr, value)?;

        let backend = &mut self.backend;
        self.staged
            .stage_set_with(
                ObjectType::Route,
                &name,
                group,
                attr.name(),
                value,
                async || Ok(live_attrs(&live_route(backend, &key).await?)),
            )
            .await
    }

    /// Apply the staged route as a single create, replace or delete. A
    /// replace starts from the live route, so the backend sees its current
    /// attributes.
    pub(crate) async fn route_commit(&mut self, group: GroupId, instance: &str) -> Result<()> {
        let (key, name) = route_instance(instance)?;

        let backend = &mut self.backend;
        self.staged
            .commit(ObjectType::Route, &name, group, async move |obj| {
                let change = match obj.action {
                    StagedAction::Create => RouteChange::Create(apply_attrs(key, &obj)?),
                    StagedAction::Set => {
                        let current = live_route(&mut *backend, &key).await?;
                        RouteChange::Replace {
                            desired: apply_attrs(current.clone(), &obj)?,
                            current,
                        }
                    }
                    StagedAction::Delete => RouteChange::Delete(key),
                };
                backend.route_replace_or_delete(&change).await
            })
            .await
    }
}
