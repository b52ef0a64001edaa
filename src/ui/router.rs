//! Routes raw host events to sessions, listeners and cell handlers

use tracing::{debug, trace};

use crate::core::{ClickContext, SlotPos};
use crate::error::{MenuError, Result};
use crate::ui::{ClickAction, ClickEvent, CloseEvent, DragEvent, HostEvent, HostShutdown, OpenEvent, UserLeft};
use crate::wm::MenuManager;

/// Whether an event concerned a menu session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Not ours, the host handles it as usual
    Ignored,
    Routed,
}

/// Event entry point for the host
pub struct EventRouter<T> {
    manager: MenuManager<T>,
}

impl<T: Clone + 'static> EventRouter<T> {
    pub fn new(manager: MenuManager<T>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &MenuManager<T> {
        &self.manager
    }

    pub fn dispatch(&self, event: &mut HostEvent) -> Result<Dispatch> {
        match event {
            HostEvent::Click(click) => self.on_click(click),
            HostEvent::Drag(drag) => Ok(self.on_drag(drag)),
            HostEvent::Open(open) => Ok(self.on_open(open)),
            HostEvent::Close(close) => Ok(self.on_close(close)),
            HostEvent::UserLeft(left) => Ok(self.on_user_left(left)),
            HostEvent::Shutdown(shutdown) => {
                self.on_shutdown(shutdown);
                Ok(Dispatch::Routed)
            }
        }
    }

    /// Route a click.
    ///
    /// Clicks on slots that aren't editable are cancelled before the cell
    /// handler runs; the handler may uncancel. A handler error is returned
    /// after the surface has been resynced.
    pub fn on_click(&self, event: &mut ClickEvent) -> Result<Dispatch> {
        let user = event.user;
        let Some(session) = self.manager.open_session(user) else {
            return Ok(Dispatch::Ignored);
        };

        if matches!(event.action, ClickAction::CollectToCursor | ClickAction::Nothing) {
            trace!("Cancelled {:?} for {}", event.action, user);
            event.cancel();
            return Ok(Dispatch::Routed);
        }

        // Anything outside the menu's own grid belongs to the host
        if session.surface_id() != Some(event.surface) {
            return Ok(Dispatch::Ignored);
        }
        let (rows, columns) = session.window.size();
        if event.slot >= rows * columns {
            return Ok(Dispatch::Ignored);
        }
        let slot = SlotPos::from_index(event.slot, columns);

        session.window.listeners().fire_click(event, &self.manager);
        if !self.manager.is_current(user, session.id) {
            debug!("Click listener replaced {} of {}, skipping the cell", session.id, user);
            return Ok(Dispatch::Routed);
        }

        let mut contents = session.contents.try_borrow_mut().map_err(|_| MenuError::ContentsBusy(user))?;
        let editable = contents.is_editable(slot);
        if !editable {
            event.cancel();
        }

        let target = contents.get(slot).and_then(|cell| Some((cell.handler.clone()?, cell.item.clone())));
        let result = match target {
            Some((handler, item)) => {
                let mut ctx = ClickContext {
                    event: &mut *event,
                    user,
                    item,
                    slot,
                    contents: &mut *contents,
                    manager: &self.manager,
                };
                handler(&mut ctx)
            }
            None => Ok(()),
        };
        drop(contents);

        if !editable {
            // The host may have drawn the blocked change already
            if let Some(surface) = self.manager.surface(user) {
                surface.resync();
            }
        }
        debug!("Click on {} by {} ({:?}, cancelled: {})", slot, user, event.action, event.is_cancelled());

        result?;
        Ok(Dispatch::Routed)
    }

    /// Drags touching any slot of the menu are cancelled
    pub fn on_drag(&self, event: &mut DragEvent) -> Dispatch {
        let Some(session) = self.manager.open_session(event.user) else {
            return Dispatch::Ignored;
        };
        let (rows, columns) = session.window.size();
        if event.slots.iter().any(|&slot| slot < rows * columns) {
            event.cancel();
        }
        session.window.listeners().fire_drag(event, &self.manager);
        Dispatch::Routed
    }

    pub fn on_open(&self, event: &OpenEvent) -> Dispatch {
        routed(self.manager.host_opened(event))
    }

    pub fn on_close(&self, event: &CloseEvent) -> Dispatch {
        routed(self.manager.host_closed(event))
    }

    pub fn on_user_left(&self, event: &UserLeft) -> Dispatch {
        routed(self.manager.user_left(event))
    }

    pub fn on_shutdown(&self, _event: &HostShutdown) {
        self.manager.shutdown();
    }
}

fn routed(matched: bool) -> Dispatch {
    if matched {
        Dispatch::Routed
    } else {
        Dispatch::Ignored
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use anyhow::bail;

    use super::*;
    use crate::core::{Cell, UserId};
    use crate::ui::SurfaceId;
    use crate::wm::testing::{setup, TestAdapter};
    use crate::wm::{Listener, Window, WindowBuilder};

    const ALICE: UserId = UserId(1);

    fn window(manager: &MenuManager<i32>, id: &str) -> WindowBuilder<i32> {
        Window::builder().id(id).manager(manager).size(2, 3)
    }

    fn click(slot: usize) -> ClickEvent {
        ClickEvent::new(SurfaceId(1), ALICE, slot, ClickAction::Pickup)
    }

    fn open_with(init: impl Fn(&mut crate::core::Contents<i32>) + 'static) -> (EventRouter<i32>, Rc<TestAdapter>) {
        let (manager, adapter) = setup();
        let menu = window(&manager, "main")
            .init_with(move |contents, _| {
                init(contents);
                Ok(())
            })
            .build()
            .unwrap();
        menu.open(ALICE).unwrap();
        (EventRouter::new(manager), adapter)
    }

    #[test]
    fn test_collect_to_cursor_is_cancelled() {
        let (router, adapter) = open_with(|_| {});
        let mut event = click(0);
        event.action = ClickAction::CollectToCursor;
        // Surface doesn't matter for this one
        event.surface = SurfaceId(42);

        assert_eq!(router.on_click(&mut event).unwrap(), Dispatch::Routed);
        assert!(event.is_cancelled());
        assert_eq!(adapter.surface(0).resyncs.get(), 0);
    }

    #[test]
    fn test_click_without_session_is_ignored() {
        let (manager, _adapter) = setup();
        let router = EventRouter::new(manager);
        let mut event = click(0);
        assert_eq!(router.on_click(&mut event).unwrap(), Dispatch::Ignored);
        assert!(!event.is_cancelled());
    }

    #[test]
    fn test_click_on_other_surface_is_ignored() {
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        let (router, _adapter) = open_with(move |contents| {
            let h = h.clone();
            contents.set(
                (0, 0),
                Some(Cell::new(1, move |_| {
                    *h.borrow_mut() += 1;
                    Ok(())
                })),
            );
        });

        let mut event = click(0);
        event.surface = SurfaceId(7);
        assert_eq!(router.on_click(&mut event).unwrap(), Dispatch::Ignored);

        let mut event = click(6);
        assert_eq!(router.on_click(&mut event).unwrap(), Dispatch::Ignored);
        assert!(!event.is_cancelled());
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn test_non_editable_click_is_cancelled_and_resynced() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let (router, adapter) = open_with(move |contents| {
            let s = s.clone();
            contents.set(
                (1, 1),
                Some(Cell::new(10, move |ctx| {
                    s.borrow_mut().push((ctx.slot, ctx.item, ctx.event.is_cancelled()));
                    Ok(())
                })),
            );
        });

        let mut event = click(4);
        assert_eq!(router.on_click(&mut event).unwrap(), Dispatch::Routed);
        assert!(event.is_cancelled());
        assert_eq!(*seen.borrow(), vec![(SlotPos::new(1, 1), Some(10), true)]);
        assert_eq!(adapter.surface(0).resyncs.get(), 1);
    }

    #[test]
    fn test_editable_click_goes_through() {
        let (router, adapter) = open_with(|contents| {
            contents.set_editable((0, 2), true);
        });

        let mut event = click(2);
        router.on_click(&mut event).unwrap();
        assert!(!event.is_cancelled());
        assert_eq!(adapter.surface(0).resyncs.get(), 0);
    }

    #[test]
    fn test_empty_slot_is_cancelled() {
        let (router, adapter) = open_with(|_| {});
        let mut event = click(3);
        router.on_click(&mut event).unwrap();
        assert!(event.is_cancelled());
        assert_eq!(adapter.surface(0).resyncs.get(), 1);
    }

    #[test]
    fn test_handler_may_uncancel_and_rewrite() {
        let (router, adapter) = open_with(|contents| {
            contents.set(
                (0, 0),
                Some(Cell::new(1, |ctx| {
                    ctx.event.set_cancelled(false);
                    ctx.contents.set(ctx.slot, Some(Cell::display(2)));
                    Ok(())
                })),
            );
        });

        let mut event = click(0);
        router.on_click(&mut event).unwrap();
        assert!(!event.is_cancelled());
        assert_eq!(*adapter.surface(0).writes.borrow(), vec![(0, Some(2))]);
    }

    #[test]
    fn test_handler_error_propagates_after_resync() {
        let (router, adapter) = open_with(|contents| {
            contents.set((0, 0), Some(Cell::new(1, |_| bail!("out of stock"))));
        });

        let mut event = click(0);
        let err = router.on_click(&mut event).unwrap_err();
        assert!(matches!(err, MenuError::Handler(_)));
        assert_eq!(err.to_string(), "out of stock");
        assert_eq!(adapter.surface(0).resyncs.get(), 1);
    }

    #[test]
    fn test_handler_opening_another_menu_resyncs_new_surface() {
        let (manager, adapter) = setup();
        let next = window(&manager, "next").build().unwrap();
        let menu = {
            let next = next.clone();
            window(&manager, "main")
                .init_with(move |contents, _| {
                    let next = next.clone();
                    contents.set(
                        (0, 0),
                        Some(Cell::new(1, move |ctx| {
                            next.open(ctx.user)?;
                            Ok(())
                        })),
                    );
                    Ok(())
                })
                .build()
                .unwrap()
        };
        menu.open(ALICE).unwrap();
        let router = EventRouter::new(manager.clone());

        router.on_click(&mut click(0)).unwrap();
        assert!(manager.window(ALICE).map_or(false, |w| Rc::ptr_eq(&w, &next)));
        assert_eq!(adapter.surface(0).resyncs.get(), 0);
        assert_eq!(adapter.surface(1).resyncs.get(), 1);
    }

    #[test]
    fn test_click_listeners_run_before_handler() {
        let (manager, _adapter) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        let h = log.clone();
        let menu = window(&manager, "main")
            .listener(Listener::on_click(move |_, _| l.borrow_mut().push("listener")))
            .init_with(move |contents, _| {
                let h = h.clone();
                contents.set(
                    (0, 0),
                    Some(Cell::new(1, move |_| {
                        h.borrow_mut().push("handler");
                        Ok(())
                    })),
                );
                Ok(())
            })
            .build()
            .unwrap();
        menu.open(ALICE).unwrap();

        EventRouter::new(manager).on_click(&mut click(0)).unwrap();
        assert_eq!(*log.borrow(), vec!["listener", "handler"]);
    }

    #[test]
    fn test_drag_over_menu_is_cancelled() {
        let (router, _adapter) = open_with(|_| {});

        let mut outside = DragEvent::new(ALICE, vec![6, 7, 8]);
        assert_eq!(router.on_drag(&mut outside), Dispatch::Routed);
        assert!(!outside.is_cancelled());

        let mut inside = DragEvent::new(ALICE, vec![8, 5]);
        router.on_drag(&mut inside);
        assert!(inside.is_cancelled());

        let mut stranger = DragEvent::new(UserId(9), vec![0]);
        assert_eq!(router.on_drag(&mut stranger), Dispatch::Ignored);
        assert!(!stranger.is_cancelled());
    }

    #[test]
    fn test_drag_listeners_see_the_verdict() {
        let (manager, _adapter) = setup();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let menu = window(&manager, "main")
            .listener(Listener::on_drag(move |event, _| {
                s.borrow_mut().push((event.slots.clone(), event.is_cancelled()))
            }))
            .build()
            .unwrap();
        menu.open(ALICE).unwrap();
        let router = EventRouter::new(manager);

        router.on_drag(&mut DragEvent::new(ALICE, vec![2, 9]));
        router.on_drag(&mut DragEvent::new(ALICE, vec![6, 7]));
        router.on_drag(&mut DragEvent::new(UserId(9), vec![0]));

        assert_eq!(*seen.borrow(), vec![(vec![2, 9], true), (vec![6, 7], false)]);
    }

    #[test]
    fn test_listener_closing_menu_skips_cell_handler() {
        let (manager, adapter) = setup();
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        let menu = window(&manager, "main")
            .listener(Listener::on_click(|event, manager| manager.close(event.user)))
            .init_with(move |contents, _| {
                let h = h.clone();
                contents.set(
                    (0, 0),
                    Some(Cell::new(1, move |_| {
                        *h.borrow_mut() += 1;
                        Ok(())
                    })),
                );
                Ok(())
            })
            .build()
            .unwrap();
        menu.open(ALICE).unwrap();
        let router = EventRouter::new(manager.clone());

        let mut event = click(0);
        assert_eq!(router.on_click(&mut event).unwrap(), Dispatch::Routed);
        assert!(manager.session(ALICE).is_none());
        assert_eq!(*hits.borrow(), 0);
        assert!(!event.is_cancelled());
        assert!(adapter.surface(0).closed.get());
        assert_eq!(adapter.surface(0).resyncs.get(), 0);
    }

    #[test]
    fn test_listener_replacing_menu_leaves_new_grid_alone() {
        let (manager, adapter) = setup();
        let next = window(&manager, "next")
            .init_with(|contents, _| {
                contents.set((0, 0), Some(Cell::display(7)));
                Ok(())
            })
            .build()
            .unwrap();
        let menu = {
            let next = next.clone();
            window(&manager, "main")
                .listener(Listener::on_click(move |event, _| {
                    next.open(event.user).unwrap();
                }))
                .init_with(|contents, _| {
                    contents.set((0, 0), Some(Cell::new(1, |_| bail!("stale handler ran"))));
                    Ok(())
                })
                .build()
                .unwrap()
        };
        menu.open(ALICE).unwrap();
        let router = EventRouter::new(manager.clone());

        router.on_click(&mut click(0)).unwrap();
        assert!(manager.window(ALICE).map_or(false, |w| Rc::ptr_eq(&w, &next)));
        assert_eq!(adapter.surface(1).resyncs.get(), 0);
        let contents = manager.contents(ALICE).unwrap();
        assert_eq!(contents.borrow().get((0, 0)).and_then(|c| c.item), Some(7));
    }

    #[test]
    fn test_dispatch_lifecycle_events() {
        let (manager, _adapter) = setup();
        let opened = Rc::new(RefCell::new(Vec::new()));
        let o = opened.clone();
        let menu = window(&manager, "main")
            .listener(Listener::on_open(move |event, _| o.borrow_mut().push((event.user, event.surface))))
            .build()
            .unwrap();
        menu.open(ALICE).unwrap();
        let router = EventRouter::new(manager);

        let mut wrong = HostEvent::Close(CloseEvent {
            user: ALICE,
            surface: Some(SurfaceId(5)),
        });
        assert_eq!(router.dispatch(&mut wrong).unwrap(), Dispatch::Ignored);

        let mut open = HostEvent::Open(OpenEvent {
            user: ALICE,
            surface: SurfaceId(1),
        });
        assert_eq!(router.dispatch(&mut open).unwrap(), Dispatch::Routed);
        assert_eq!(*opened.borrow(), vec![(ALICE, SurfaceId(1))]);

        let mut close = HostEvent::Close(CloseEvent {
            user: ALICE,
            surface: Some(SurfaceId(1)),
        });
        assert_eq!(router.dispatch(&mut close).unwrap(), Dispatch::Routed);
        assert!(router.manager().session(ALICE).is_none());

        let mut left = HostEvent::UserLeft(UserLeft { user: ALICE });
        assert_eq!(router.dispatch(&mut left).unwrap(), Dispatch::Ignored);

        let mut shutdown = HostEvent::Shutdown(HostShutdown);
        assert_eq!(router.dispatch(&mut shutdown).unwrap(), Dispatch::Routed);
    }

    #[test]
    fn test_busy_contents() {
        let (router, _adapter) = open_with(|_| {});
        let contents = router.manager().contents(ALICE).unwrap();
        let _guard = contents.borrow_mut();

        let err = router.on_click(&mut click(0)).unwrap_err();
        assert!(matches!(err, MenuError::ContentsBusy(ALICE)));
    }
}
