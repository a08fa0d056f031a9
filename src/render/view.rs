use super::cx::RenderCx;
use crate::error::Result;

/// Output of one render.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    Text(String),
    /// A child rendered through [`RenderCx::child`], by key.
    Child(String),
    Fragment(Vec<View>),
    #[default]
    Empty,
}

impl View {
    pub fn text(text: impl Into<String>) -> Self {
        View::Text(text.into())
    }

    pub fn empty() -> Self {
        View::Empty
    }

    pub fn fragment(views: impl IntoIterator<Item = View>) -> Self {
        View::Fragment(views.into_iter().collect())
    }
}

/// Something that renders a [`View`].
///
/// Any `Fn(&mut RenderCx) -> Result<View>` closure is a component.
pub trait Component: Send + Sync + 'static {
    fn render(&self, cx: &mut RenderCx) -> Result<View>;
}

impl<F> Component for F
where
    F: Fn(&mut RenderCx) -> Result<View> + Send + Sync + 'static,
{
    fn render(&self, cx: &mut RenderCx) -> Result<View> {
        self(cx)
    }
}

/// Pin a closure to the component signature so its argument type is inferred.
pub fn component<F>(render: F) -> F
where
    F: Fn(&mut RenderCx) -> Result<View> + Send + Sync + 'static,
{
    render
}
