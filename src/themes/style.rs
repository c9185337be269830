/// Widgets with a semantic style override.
///
/// Styles default from the active `egui::Style`; callers that need a
/// different look per instance set an explicit style instead of mutating
/// the context.
pub trait Styled {
    type Style;

    fn set_style(&mut self, style: Option<Self::Style>);

    fn styled(mut self, style: Self::Style) -> Self
    where
        Self: Sized,
    {
        self.set_style(Some(style));
        self
    }
}
