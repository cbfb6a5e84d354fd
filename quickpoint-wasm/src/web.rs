//! Browser bindings: the main viewer and the presenter window.
//!
//! Both talk over a `BroadcastChannel` and keep their state in an
//! `Rc<RefCell<_>>` shared with the DOM event closures.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{BroadcastChannel, Element, Event, KeyboardEvent, MessageEvent, TouchEvent, Window};

use quickpoint_core::markup::{parse_int_prefix, STEP_ATTRIBUTE};
use quickpoint_core::{error_notice_html, intent_for_key, intent_for_swipe, Intent, RevealTarget, StepElement};
use quickpoint_sync::{Effects, PresenterView, SyncMessage, ViewerConfig, ViewerController};

use crate::bridge;

const ACTIVE_CLASS: &str = "active";
const VISIBLE_CLASS: &str = "visible";

fn js_error(message: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&message.to_string())
}

fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| js_error("no global window"))
}

/// Current fragment, or `None` when empty.
fn current_hash(window: &Window) -> Option<String> {
    window.location().hash().ok().filter(|hash| !hash.is_empty())
}

fn post(channel: &BroadcastChannel, message: &SyncMessage) {
    let result = message
        .encode()
        .map_err(js_error)
        .and_then(|text| js_sys::JSON::parse(&text))
        .and_then(|value| channel.post_message(&value));
    if let Err(e) = result {
        log::warn!("web: could not post {}: {e:?}", message.type_name());
    }
}

fn posted_message(event: &MessageEvent) -> Option<SyncMessage> {
    let text = js_sys::JSON::stringify(&event.data()).ok().map(String::from)?;
    bridge::decode_posted(&text)
}

/// Step-tagged elements of one rendered slide.
struct DomSlide {
    nodes: Vec<Element>,
}

impl DomSlide {
    /// Collects `[data-step]` elements in document order, all hidden.
    fn new(root: &Element) -> Self {
        let mut nodes = Vec::new();
        if let Ok(list) = root.query_selector_all(&format!("[{STEP_ATTRIBUTE}]")) {
            for index in 0..list.length() {
                if let Some(element) = list.item(index).and_then(|node| node.dyn_into::<Element>().ok()) {
                    let _ = element.class_list().remove_1(VISIBLE_CLASS);
                    nodes.push(element);
                }
            }
        }
        Self { nodes }
    }
}

impl RevealTarget for DomSlide {
    fn step_elements(&self) -> Vec<StepElement> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(ordinal, element)| {
                let marker = parse_int_prefix(&element.get_attribute(STEP_ATTRIBUTE)?)?;
                Some(StepElement {
                    ordinal,
                    marker,
                    tag: element.tag_name().to_lowercase(),
                })
            })
            .collect()
    }

    fn set_revealed(&mut self, ordinal: usize, revealed: bool) {
        if let Some(element) = self.nodes.get(ordinal) {
            let _ = element.class_list().toggle_with_force(VISIBLE_CLASS, revealed);
        }
    }
}

struct ViewerState {
    window: Window,
    controller: ViewerController,
    channel: Option<BroadcastChannel>,
    slides: Vec<Element>,
}

impl ViewerState {
    fn apply(&mut self, effects: Effects) {
        if let Some(token) = &effects.location {
            let replaced = self
                .window
                .history()
                .and_then(|history| history.replace_state_with_url(&JsValue::NULL, "", Some(token.to_hash().as_str())));
            if let Err(e) = replaced {
                log::warn!("web: could not replace location: {e:?}");
            }
        }
        if effects.position.is_some() {
            self.render();
        }
        if let Some(channel) = &self.channel {
            for message in &effects.outgoing {
                post(channel, message);
            }
        }
    }

    fn render(&self) {
        let position = self.controller.current_position();
        for (index, slide) in self.slides.iter().enumerate() {
            let _ = slide.class_list().toggle_with_force(ACTIVE_CLASS, index == position.slide);
        }
        if let (Some(slide), Some(projector)) = (self.slides.get(position.slide), self.controller.reveal_projector()) {
            projector.project(&mut DomSlide::new(slide));
        }
    }

    fn handle(&mut self, intent: Intent) {
        let effects = self.controller.handle_intent(intent);
        self.apply(effects);
    }
}

/// Main (primary) viewer bound to a container element.
#[wasm_bindgen]
pub struct QuickPointViewer {
    state: Rc<RefCell<ViewerState>>,
    on_message: Option<Closure<dyn FnMut(MessageEvent)>>,
    on_hash: Option<Closure<dyn FnMut(Event)>>,
    on_key: Option<Closure<dyn FnMut(KeyboardEvent)>>,
    on_touch_start: Option<Closure<dyn FnMut(TouchEvent)>>,
    on_touch_end: Option<Closure<dyn FnMut(TouchEvent)>>,
}

#[wasm_bindgen]
impl QuickPointViewer {
    /// Render `sources` into `container`. The `receiver` query flag of
    /// the page decides whether the viewer joins the sync channel.
    #[wasm_bindgen(constructor)]
    pub fn new(container: Element, labels: Vec<String>, sources: Vec<String>) -> Result<QuickPointViewer, JsValue> {
        let window = window()?;
        let config = ViewerConfig::from_query(&window.location().search()?);

        let deck = match bridge::deck_from_parts(&labels, sources) {
            Ok(deck) => deck,
            Err(e) => {
                container.set_inner_html(&error_notice_html(&e));
                return Err(js_error(e));
            }
        };

        let document = window.document().ok_or_else(|| js_error("no document"))?;
        container.set_inner_html("");
        let mut slides = Vec::with_capacity(deck.len());
        for slide in deck.slides() {
            let element = document.create_element("div")?;
            element.set_class_name("slide");
            element.set_id(&format!("slide-{}", slide.index() + 1));
            element.set_inner_html(slide.html());
            container.append_child(&element)?;
            slides.push(element);
        }

        let channel = if config.receiver {
            Some(BroadcastChannel::new(&config.channel_name)?)
        } else {
            None
        };

        Ok(Self {
            state: Rc::new(RefCell::new(ViewerState {
                window,
                controller: ViewerController::primary(deck, config),
                channel,
                slides,
            })),
            on_message: None,
            on_hash: None,
            on_key: None,
            on_touch_start: None,
            on_touch_end: None,
        })
    }

    /// Attach listeners, apply the initial location and announce it.
    pub fn start(&mut self) -> Result<(), JsValue> {
        let window = self.state.borrow().window.clone();

        if let Some(channel) = self.state.borrow().channel.clone() {
            let state = self.state.clone();
            let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
                if let Some(message) = posted_message(&event) {
                    let mut state = state.borrow_mut();
                    let effects = state.controller.handle_message(message);
                    state.apply(effects);
                }
            });
            channel.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
            self.on_message = Some(on_message);
        }

        let state = self.state.clone();
        let on_hash = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            let mut state = state.borrow_mut();
            if let Some(hash) = current_hash(&state.window) {
                let effects = state.controller.handle_location(&hash);
                state.apply(effects);
            }
        });
        window.add_event_listener_with_callback("hashchange", on_hash.as_ref().unchecked_ref())?;
        self.on_hash = Some(on_hash);

        let state = self.state.clone();
        let on_key = Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
            if let Some(intent) = intent_for_key(&event.key()) {
                state.borrow_mut().handle(intent);
            }
        });
        window.add_event_listener_with_callback("keydown", on_key.as_ref().unchecked_ref())?;
        self.on_key = Some(on_key);

        let touch_x = Rc::new(Cell::new(0.0_f64));
        let start_x = touch_x.clone();
        let on_touch_start = Closure::<dyn FnMut(TouchEvent)>::new(move |event: TouchEvent| {
            if let Some(touch) = event.changed_touches().get(0) {
                start_x.set(f64::from(touch.client_x()));
            }
        });
        let state = self.state.clone();
        let on_touch_end = Closure::<dyn FnMut(TouchEvent)>::new(move |event: TouchEvent| {
            let Some(touch) = event.changed_touches().get(0) else { return };
            if let Some(intent) = intent_for_swipe(touch_x.get(), f64::from(touch.client_x())) {
                state.borrow_mut().handle(intent);
            }
        });
        window.add_event_listener_with_callback("touchstart", on_touch_start.as_ref().unchecked_ref())?;
        window.add_event_listener_with_callback("touchend", on_touch_end.as_ref().unchecked_ref())?;
        self.on_touch_start = Some(on_touch_start);
        self.on_touch_end = Some(on_touch_end);

        let mut state = self.state.borrow_mut();
        let hash = current_hash(&state.window);
        let effects = state.controller.start(hash.as_deref());
        state.apply(effects);
        Ok(())
    }

    pub fn next(&self) {
        self.state.borrow_mut().handle(Intent::Advance);
    }

    pub fn prev(&self) {
        self.state.borrow_mut().handle(Intent::Retreat);
    }

    /// Navigate to a location token such as `#slide-3-step-1`.
    #[wasm_bindgen(js_name = goTo)]
    pub fn go_to(&self, location: &str) {
        let mut state = self.state.borrow_mut();
        let effects = state.controller.handle_location(location);
        state.apply(effects);
    }

    #[wasm_bindgen(getter)]
    pub fn index(&self) -> usize {
        self.state.borrow().controller.current_position().slide
    }

    #[wasm_bindgen(getter)]
    pub fn step(&self) -> i32 {
        self.state.borrow().controller.current_position().step_signed() as i32
    }

    #[wasm_bindgen(getter, js_name = slideCount)]
    pub fn slide_count(&self) -> usize {
        self.state.borrow().slides.len()
    }

    /// Detach listeners and close the channel.
    pub fn destroy(&mut self) {
        let state = self.state.borrow();
        if let Some(channel) = &state.channel {
            channel.set_onmessage(None);
            channel.close();
        }
        let window = &state.window;
        if let Some(cb) = self.on_hash.take() {
            let _ = window.remove_event_listener_with_callback("hashchange", cb.as_ref().unchecked_ref());
        }
        if let Some(cb) = self.on_key.take() {
            let _ = window.remove_event_listener_with_callback("keydown", cb.as_ref().unchecked_ref());
        }
        if let Some(cb) = self.on_touch_start.take() {
            let _ = window.remove_event_listener_with_callback("touchstart", cb.as_ref().unchecked_ref());
        }
        if let Some(cb) = self.on_touch_end.take() {
            let _ = window.remove_event_listener_with_callback("touchend", cb.as_ref().unchecked_ref());
        }
        self.on_message = None;
    }
}

struct PresenterState {
    view: PresenterView,
    channel: Option<BroadcastChannel>,
    on_change: Option<js_sys::Function>,
}

/// Change callback and the snapshot JSON it receives.
type Notification = (js_sys::Function, String);

impl PresenterState {
    fn apply(&mut self, effects: Effects) -> Option<Notification> {
        if let Some(channel) = &self.channel {
            for message in &effects.outgoing {
                post(channel, message);
            }
        }
        if effects.position.is_none() {
            return None;
        }
        let callback = self.on_change.clone()?;
        Some((callback, bridge::snapshot_json(&self.view.snapshot()).to_string()))
    }
}

fn notify((callback, snapshot): Notification) {
    match js_sys::JSON::parse(&snapshot) {
        Ok(snapshot) => {
            if let Err(e) = callback.call1(&JsValue::NULL, &snapshot) {
                log::warn!("web: presenter callback failed: {e:?}");
            }
        }
        Err(e) => log::warn!("web: bad snapshot: {e:?}"),
    }
}

/// Update the presenter, then run the page callback with the state
/// released.
fn drive(state: &RefCell<PresenterState>, update: impl FnOnce(&mut PresenterView) -> Effects) {
    bridge::update_then_deliver(
        state,
        |state| {
            let effects = update(&mut state.view);
            state.apply(effects)
        },
        notify,
    );
}

/// Presenter (satellite) window. Page scripts render the snapshot it
/// hands to the change callback; preview frames load `index.html`
/// with `?receiver=false` plus the snapshot's hashes.
#[wasm_bindgen]
pub struct QuickPointPresenter {
    state: Rc<RefCell<PresenterState>>,
    on_message: Option<Closure<dyn FnMut(MessageEvent)>>,
}

#[wasm_bindgen]
impl QuickPointPresenter {
    /// Like the viewer, a false-equivalent `receiver` query flag keeps
    /// the presenter off the sync channel.
    #[wasm_bindgen(constructor)]
    pub fn new(labels: Vec<String>, sources: Vec<String>) -> Result<QuickPointPresenter, JsValue> {
        let deck = bridge::deck_from_parts(&labels, sources).map_err(js_error)?;
        let config = ViewerConfig::satellite().with_query(&window()?.location().search()?);
        let channel = if config.receiver {
            Some(BroadcastChannel::new(&config.channel_name)?)
        } else {
            None
        };
        Ok(Self {
            state: Rc::new(RefCell::new(PresenterState {
                view: PresenterView::new(deck, config),
                channel,
                on_change: None,
            })),
            on_message: None,
        })
    }

    /// Listen on the channel and ask the main window for its Position.
    pub fn start(&mut self, on_change: js_sys::Function) {
        let channel = {
            let mut state = self.state.borrow_mut();
            state.on_change = Some(on_change);
            state.channel.clone()
        };

        if let Some(channel) = channel {
            let state = self.state.clone();
            let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
                if let Some(message) = posted_message(&event) {
                    drive(&state, |view| view.handle_message(message));
                }
            });
            channel.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
            self.on_message = Some(on_message);
        }

        drive(&self.state, |view| view.controller_mut().start(None));
    }

    pub fn next(&self) {
        drive(&self.state, PresenterView::press_next);
    }

    pub fn prev(&self) {
        drive(&self.state, PresenterView::press_prev);
    }

    /// Key handler for the presenter window.
    #[wasm_bindgen(js_name = handleKey)]
    pub fn handle_key(&self, key: &str) {
        match intent_for_key(key) {
            Some(Intent::Advance) => self.next(),
            Some(Intent::Retreat) => self.prev(),
            _ => {}
        }
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        let value = bridge::snapshot_json(&self.state.borrow().view.snapshot());
        js_sys::JSON::parse(&value.to_string())
    }

    pub fn destroy(&mut self) {
        if let Some(channel) = &self.state.borrow().channel {
            channel.set_onmessage(None);
            channel.close();
        }
        self.on_message = None;
    }
}
