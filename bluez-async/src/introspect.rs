use crate::BluetoothError;
use dbus::nonblock::stdintf::org_freedesktop_dbus::Introspectable;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;

/// The subset of a D-Bus introspection XML document that we care about: the set of child object
/// paths below this one.
#[derive(Debug, Deserialize)]
pub(crate) struct Node {
    #[serde(rename = "node", default)]
    pub nodes: Vec<SubNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubNode {
    pub name: Option<String>,
}

/// Extension trait to introspect an object over D-Bus and parse the resulting XML into a [`Node`].
pub(crate) trait IntrospectParse {
    fn introspect_parse(&self) -> BoxFuture<'_, Result<Node, BluetoothError>>;
}

impl<T: Introspectable + Sync> IntrospectParse for T {
    fn introspect_parse(&self) -> BoxFuture<'_, Result<Node, BluetoothError>> {
        async move {
            let xml = self.introspect().await?;
            Ok(serde_xml_rs::from_str(&xml)?)
        }
        .boxed()
    }
}
