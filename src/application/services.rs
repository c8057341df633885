use std::io::Write;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{
    application::{
        annotator::Annotator,
        ports::{CameraCatalogPort, CameraPort, DetectorPort, DisplayPort, FrameRenderer, FrameStream},
        reporter::ConsoleReporter,
        session::Session,
    },
    domain::{
        camera::CameraInfo,
        errors::{DomainError, DomainResult},
        model::Task,
        stream::{summarize_detections, FrameMeta},
    },
};

pub const WINDOW_NAME: &str = "Resultados YOLO";
const QUIT_KEYS: [char; 2] = ['q', '\u{1b}'];

/// Servicio de inventario de cámaras.
pub struct CameraService<K: CameraCatalogPort> {
    catalog: K,
}

impl<K: CameraCatalogPort> CameraService<K> {
    pub fn new(catalog: K) -> Self {
        Self { catalog }
    }

    pub fn list_cameras(&self) -> DomainResult<Vec<CameraInfo>> {
        self.catalog.list_cameras()
    }
}

#[derive(Debug, Clone)]
pub struct LoopOptions {
    pub task: Task,
    pub flip: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    QuitKey,
    WindowClosed,
    EndOfStream,
    ReadFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub stop: StopReason,
}

/// Orquestador del bucle: captura, inferencia, anotación, consola y ventana.
/// Un único hilo, todo bloqueante.
pub struct WebcamService<C, M, R, D, W>
where
    C: CameraPort,
    M: DetectorPort,
    R: FrameRenderer,
    D: DisplayPort,
    W: Write,
{
    camera: C,
    detector: M,
    renderer: R,
    display: D,
    reporter: ConsoleReporter<W>,
    annotator: Annotator,
    options: LoopOptions,
}

impl<C, M, R, D, W> WebcamService<C, M, R, D, W>
where
    C: CameraPort,
    M: DetectorPort,
    R: FrameRenderer,
    D: DisplayPort,
    W: Write,
{
    pub fn new(
        camera: C,
        detector: M,
        renderer: R,
        display: D,
        reporter: ConsoleReporter<W>,
        options: LoopOptions,
    ) -> Self {
        Self {
            camera,
            detector,
            renderer,
            display,
            reporter,
            annotator: Annotator::new(),
            options,
        }
    }

    /// Ejecuta el bucle hasta la tecla de salida o un fallo de captura.
    /// Un fallo al abrir la cámara se devuelve antes de procesar ningún frame.
    pub fn run(&mut self, session: &mut Session) -> DomainResult<RunSummary> {
        let mut stream = self.camera.open()?;
        info!("Bucle iniciado: tarea={} espejo={}", self.options.task, self.options.flip);

        let outcome = self.frame_loop(&mut stream, session);

        // Liberar recursos pase lo que pase
        stream.release();
        self.display.close_all_windows();

        if let Ok(summary) = &outcome {
            info!("Bucle terminado tras {} frames ({:?})", summary.frames, summary.stop);
        }
        outcome
    }

    fn frame_loop(&mut self, stream: &mut C::Stream, session: &mut Session) -> DomainResult<RunSummary> {
        let mut frames = 0u64;

        let stop = loop {
            if !self.display.is_open() {
                break StopReason::WindowClosed;
            }

            let mut frame = match stream.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => break StopReason::EndOfStream,
                Err(e) => {
                    error!("{e}");
                    break StopReason::ReadFailure;
                }
            };

            if self.options.flip {
                image::imageops::flip_horizontal_in_place(&mut frame);
            }

            let t_infer = Instant::now();
            let detections = self.detector.infer(&frame)?;
            let infer_ms = t_infer.elapsed().as_secs_f32() * 1000.0;

            let (width, height) = frame.dimensions();
            let mut canvas = self.renderer.begin(frame);
            let lines = match self.annotator.annotate(
                &mut canvas,
                &detections,
                self.options.task,
                &mut session.colors,
            ) {
                Ok(lines) => lines,
                Err(DomainError::EmptyClassification) => {
                    warn!("{}", DomainError::EmptyClassification);
                    Vec::new()
                }
                Err(e) => return Err(e),
            };
            let frame = self.renderer.finish(canvas);

            let meta = FrameMeta { width, height, infer_ms, lines };
            debug!(
                "frame {}x{} infer={:.1}ms [{}]",
                meta.width,
                meta.height,
                meta.infer_ms,
                summarize_detections(&meta.lines)
            );

            self.reporter
                .report(&mut session.display, &meta.lines)
                .map_err(|e| DomainError::Display(format!("consola: {e}")))?;

            self.display.show(WINDOW_NAME, &frame)?;
            frames += 1;

            if self.display.poll_key().is_some_and(|k| QUIT_KEYS.contains(&k)) {
                break StopReason::QuitKey;
            }
        };

        Ok(RunSummary { frames, stop })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::annotator::tests::{Op, RecordingCanvas};
    use crate::application::ports::Canvas;
    use crate::domain::detection::Mask;
    use crate::domain::detection::Detection;
    use image::{Rgb, RgbImage};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        released: bool,
        closed: bool,
        shown: Vec<RgbImage>,
        ops: Vec<Vec<Op>>,
        inferred: Vec<RgbImage>,
    }

    type Shared = Rc<RefCell<Log>>;

    enum Read {
        Frame(RgbImage),
        Fail,
    }

    struct FakeCamera {
        script: RefCell<Option<VecDeque<Read>>>,
        log: Shared,
        available: bool,
    }

    struct FakeStream {
        script: VecDeque<Read>,
        log: Shared,
    }

    impl CameraPort for FakeCamera {
        type Stream = FakeStream;

        fn open(&self) -> DomainResult<FakeStream> {
            if !self.available {
                return Err(DomainError::CameraUnavailable("/dev/video9".into()));
            }
            let script = self.script.borrow_mut().take().unwrap_or_default();
            Ok(FakeStream { script, log: self.log.clone() })
        }
    }

    impl FrameStream for FakeStream {
        fn read(&mut self) -> DomainResult<Option<RgbImage>> {
            match self.script.pop_front() {
                Some(Read::Frame(f)) => Ok(Some(f)),
                Some(Read::Fail) => Err(DomainError::FrameRead("timeout".into())),
                None => Ok(None),
            }
        }

        fn release(self) {
            self.log.borrow_mut().released = true;
        }
    }

    struct FakeDetector {
        detections: Vec<Detection>,
        log: Shared,
    }

    impl DetectorPort for FakeDetector {
        fn infer(&mut self, frame: &RgbImage) -> DomainResult<Vec<Detection>> {
            self.log.borrow_mut().inferred.push(frame.clone());
            Ok(self.detections.clone())
        }
    }

    struct RecordingRenderer {
        log: Shared,
    }

    struct FrameCanvas {
        frame: RgbImage,
        rec: RecordingCanvas,
    }

    impl Canvas for FrameCanvas {
        fn dimensions(&self) -> (u32, u32) {
            self.rec.dimensions()
        }
        fn draw_rect(&mut self, a: (i32, i32), b: (i32, i32), c: Rgb<u8>, t: u32) {
            self.rec.draw_rect(a, b, c, t)
        }
        fn draw_text(&mut self, o: (i32, i32), text: &str, c: Rgb<u8>, s: f32) {
            self.rec.draw_text(o, text, c, s)
        }
        fn fill_circle(&mut self, o: (i32, i32), r: i32, c: Rgb<u8>) {
            self.rec.fill_circle(o, r, c)
        }
        fn draw_line(&mut self, a: (i32, i32), b: (i32, i32), c: Rgb<u8>, t: u32) {
            self.rec.draw_line(a, b, c, t)
        }
        fn blend_mask(&mut self, m: &Mask, c: Rgb<u8>, a: f32) {
            self.rec.blend_mask(m, c, a)
        }
    }

    impl FrameRenderer for RecordingRenderer {
        type Canvas = FrameCanvas;

        fn begin(&self, frame: RgbImage) -> FrameCanvas {
            let rec = RecordingCanvas::new(frame.width(), frame.height());
            FrameCanvas { frame, rec }
        }

        fn finish(&self, canvas: FrameCanvas) -> RgbImage {
            self.log.borrow_mut().ops.push(canvas.rec.ops);
            canvas.frame
        }
    }

    struct FakeDisplay {
        keys: VecDeque<Option<char>>,
        log: Shared,
        // La ventana se cierra tras mostrar este número de frames.
        close_after: Option<usize>,
    }

    impl DisplayPort for FakeDisplay {
        fn show(&mut self, _name: &str, frame: &RgbImage) -> DomainResult<()> {
            self.log.borrow_mut().shown.push(frame.clone());
            Ok(())
        }
        fn poll_key(&mut self) -> Option<char> {
            self.keys.pop_front().flatten()
        }
        fn close_all_windows(&mut self) {
            self.log.borrow_mut().closed = true;
        }
        fn is_open(&self) -> bool {
            self.close_after.map_or(true, |n| self.log.borrow().shown.len() < n)
        }
    }

    fn gradient() -> RgbImage {
        RgbImage::from_fn(4, 2, |x, y| Rgb([x as u8 * 10, y as u8, 0]))
    }

    struct Harness {
        log: Shared,
        service: WebcamService<FakeCamera, FakeDetector, RecordingRenderer, FakeDisplay, Vec<u8>>,
    }

    fn harness(reads: Vec<Read>, keys: Vec<Option<char>>, detections: Vec<Detection>, options: LoopOptions) -> Harness {
        let log: Shared = Rc::default();
        let service = WebcamService::new(
            FakeCamera { script: RefCell::new(Some(reads.into())), log: log.clone(), available: true },
            FakeDetector { detections, log: log.clone() },
            RecordingRenderer { log: log.clone() },
            FakeDisplay { keys: keys.into(), log: log.clone(), close_after: None },
            ConsoleReporter::new(Vec::new()),
            options,
        );
        Harness { log, service }
    }

    fn classify() -> LoopOptions {
        LoopOptions { task: Task::Classify, flip: false }
    }

    #[test]
    fn classify_end_to_end() {
        let mut h = harness(
            vec![Read::Frame(gradient()), Read::Frame(gradient())],
            vec![None, Some('q')],
            vec![Detection::new(15, "cat", 0.87)],
            classify(),
        );
        let mut session = Session::new(Some(0));

        let summary = h.service.run(&mut session).unwrap();

        assert_eq!(summary, RunSummary { frames: 2, stop: StopReason::QuitKey });
        let log = h.log.borrow();
        assert!(log.released && log.closed);
        assert_eq!(log.shown.len(), 2);
        assert!(log.ops.iter().all(|ops| matches!(
            ops.as_slice(),
            [Op::Text { origin: (10, 30), text, .. }] if text == "cat: 87%"
        )));
        // Solo se imprime una vez: el segundo frame no cambia nada.
        let console = String::from_utf8(h.service.reporter_output()).unwrap();
        assert_eq!(console.trim_end(), "cat: 87%");
        assert_eq!(console.lines().count(), 1);
    }

    #[test]
    fn stops_at_end_of_stream() {
        let mut h = harness(vec![Read::Frame(gradient())], vec![None, None], vec![], LoopOptions {
            task: Task::Detect,
            flip: false,
        });
        let summary = h.service.run(&mut Session::new(Some(0))).unwrap();
        assert_eq!(summary, RunSummary { frames: 1, stop: StopReason::EndOfStream });
        assert!(h.log.borrow().released);
    }

    #[test]
    fn read_failure_ends_the_loop() {
        let mut h = harness(
            vec![Read::Frame(gradient()), Read::Fail, Read::Frame(gradient())],
            vec![None, None, None],
            vec![],
            LoopOptions { task: Task::Segment, flip: false },
        );
        let summary = h.service.run(&mut Session::new(Some(0))).unwrap();
        assert_eq!(summary, RunSummary { frames: 1, stop: StopReason::ReadFailure });
        assert!(h.log.borrow().released && h.log.borrow().closed);
    }

    #[test]
    fn unavailable_camera_fails_before_any_frame() {
        let log: Shared = Rc::default();
        let mut service = WebcamService::new(
            FakeCamera { script: RefCell::new(None), log: log.clone(), available: false },
            FakeDetector { detections: vec![], log: log.clone() },
            RecordingRenderer { log: log.clone() },
            FakeDisplay { keys: VecDeque::new(), log: log.clone(), close_after: None },
            ConsoleReporter::new(Vec::new()),
            classify(),
        );
        let err = service.run(&mut Session::new(Some(0))).unwrap_err();
        assert!(matches!(err, DomainError::CameraUnavailable(_)));
        assert!(log.borrow().inferred.is_empty());
        assert!(log.borrow().shown.is_empty());
    }

    #[test]
    fn frames_are_mirrored_before_inference() {
        let mut h = harness(
            vec![Read::Frame(gradient())],
            vec![Some('q')],
            vec![],
            LoopOptions { task: Task::Detect, flip: true },
        );
        h.service.run(&mut Session::new(Some(0))).unwrap();

        let mut mirrored = gradient();
        image::imageops::flip_horizontal_in_place(&mut mirrored);
        let log = h.log.borrow();
        assert_eq!(log.inferred[0], mirrored);
        assert_eq!(log.shown[0], mirrored);
    }

    #[test]
    fn empty_classification_is_not_fatal() {
        let mut h = harness(
            vec![Read::Frame(gradient()), Read::Frame(gradient())],
            vec![None, Some('\u{1b}')],
            vec![],
            classify(),
        );
        let summary = h.service.run(&mut Session::new(Some(0))).unwrap();
        assert_eq!(summary, RunSummary { frames: 2, stop: StopReason::QuitKey });
        assert!(h.log.borrow().ops.iter().all(Vec::is_empty));
        assert!(h.service.reporter_output().is_empty());
    }

    #[test]
    fn other_keys_do_not_quit() {
        let mut h = harness(
            vec![Read::Frame(gradient()), Read::Frame(gradient()), Read::Frame(gradient())],
            vec![Some('a'), Some('Q'), Some('q')],
            vec![],
            LoopOptions { task: Task::Pose, flip: false },
        );
        let summary = h.service.run(&mut Session::new(Some(0))).unwrap();
        assert_eq!(summary.frames, 3);
    }

    #[test]
    fn closing_the_window_stops_the_loop() {
        let mut h = harness(
            vec![Read::Frame(gradient()), Read::Frame(gradient()), Read::Frame(gradient())],
            vec![None, None, None],
            vec![],
            LoopOptions { task: Task::Detect, flip: false },
        );
        h.service.display.close_after = Some(2);

        let summary = h.service.run(&mut Session::new(Some(0))).unwrap();

        assert_eq!(summary, RunSummary { frames: 2, stop: StopReason::WindowClosed });
        let log = h.log.borrow();
        assert_eq!(log.inferred.len(), 2);
        assert!(log.released && log.closed);
    }

    impl<C, M, R, D> WebcamService<C, M, R, D, Vec<u8>>
    where
        C: CameraPort,
        M: DetectorPort,
        R: FrameRenderer,
        D: DisplayPort,
    {
        fn reporter_output(&mut self) -> Vec<u8> {
            std::mem::take(self.reporter.sink_mut())
        }
    }
}
